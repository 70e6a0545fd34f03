//! isfshax removal
//!
//! Erases every slot named by the newest installed record and hands the
//! slots that were healthy when claimed back to the live filesystem as
//! reserved superblock clusters. Erasing is not transactional; a failed
//! erase is logged and counted, never retried.

use isfshax_core::layout::FAT_CLUSTER_RESERVED;
use isfshax_core::{SuperblockStore, GEN_FIRST, REDUNDANCY};

use crate::error::IsfshaxError;
use crate::install::commit_live;

/// What happened to one slot during removal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErasedSlot {
    pub slot: u8,
    pub first_block: u32,
    /// Blocks of this slot whose erase reported an error.
    pub erase_failures: u32,
    /// Clusters were returned to the live FAT as reserved.
    pub reclaimed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UninstallReport {
    pub slots: [ErasedSlot; REDUNDANCY],
}

/// Remove an existing isfshax install.
pub fn uninstall<S: SuperblockStore + ?Sized>(store: &mut S) -> Result<UninstallReport, IsfshaxError> {
    let geometry = store.geometry();

    log::info!("Loading latest isfshax superblock...");
    let installed = store
        .load_super(GEN_FIRST, u32::MAX)
        .map_err(IsfshaxError::NotInstalled)?;
    let info = installed.isfshax_info();
    info.validate(geometry.slot_count).map_err(|e| {
        log::error!("{}", e);
        IsfshaxError::CorruptRecord(e)
    })?;

    let mut live = store
        .load_super(0, GEN_FIRST)
        .map_err(IsfshaxError::NoUnpatchedSuperblock)?;

    let mut slots = [ErasedSlot::default(); REDUNDANCY];
    for (i, (record, erased)) in info.slots.iter().zip(slots.iter_mut()).enumerate() {
        let slot = record.slot as u32;
        let blocks = geometry.slot_blocks(slot);
        log::info!(
            "Erasing isfshax slot {} (isfs slot {}, block {}-{})",
            i,
            slot,
            blocks.start,
            blocks.end - 1
        );

        erased.slot = record.slot;
        erased.first_block = blocks.start;
        for block in blocks {
            if let Err(e) = store.erase_block(block) {
                log::warn!("Erase of block {} failed ({})", block, e);
                erased.erase_failures += 1;
            }
        }

        // Slot was defective before isfshax claimed it
        if record.bad {
            continue;
        }
        live.set_slot_clusters(&geometry, slot, FAT_CLUSTER_RESERVED);
        erased.reclaimed = true;
    }

    commit_live(store, &mut live)?;

    log::info!("SUCCESS");
    Ok(UninstallReport { slots })
}
