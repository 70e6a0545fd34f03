//! Slot allocation for isfshax
//!
//! Given the live superblock and (optionally) the record of a previous
//! install, decide which physical slots hold the `REDUNDANCY` crafted
//! copies. Good slots of a previous install are kept, bad ones are
//! replaced by fresh slots claimed from the top of the superblock area
//! downwards. Every claimed slot, kept or fresh, is marked bad in the
//! returned live superblock; nothing is written to the store here.

use isfshax_core::layout::{FAT_CLUSTER_BAD, SLOT_INDEX_LIMIT};
use isfshax_core::{IsfshaxInfo, SlotRecord, Superblock, SuperblockStore, REDUNDANCY};

use crate::config::MIN_GOOD_SLOTS;
use crate::error::IsfshaxError;

/// Result of a successful allocation scan.
#[derive(Debug, Clone)]
pub struct AllocationPlan {
    /// Slot of every redundant copy, by copy position.
    pub slots: [SlotRecord; REDUNDANCY],
    /// Live superblock with the fresh slots marked bad, ready to commit.
    pub live: Superblock,
    pub newly_allocated: usize,
    pub kept: usize,
    /// Usable native slots left after allocation.
    pub remaining_good: usize,
}

/// Compact the good records of a previous install to the top positions.
///
/// Returns the compacted records and how many positions still need a slot.
fn keep_good(current: Option<&IsfshaxInfo>) -> ([SlotRecord; REDUNDANCY], usize) {
    let mut slots = [SlotRecord::default(); REDUNDANCY];
    let mut needed = REDUNDANCY;
    if let Some(info) = current {
        for rec in info.slots.iter().rev() {
            if !rec.bad {
                needed -= 1;
                slots[needed] = *rec;
            }
        }
    }
    (slots, needed)
}

pub fn plan<S: SuperblockStore + ?Sized>(
    store: &mut S,
    mut live: Superblock,
    current: Option<&IsfshaxInfo>,
) -> Result<AllocationPlan, IsfshaxError> {
    let geometry = store.geometry();
    let (mut slots, mut needed) = keep_good(current);
    let kept = REDUNDANCY - needed;
    let newly_allocated = needed;

    // A kept slot may have been handed back to the live FAT by a partial uninstall
    for rec in &slots[needed..] {
        let index = rec.slot as u32;
        let reserved = geometry
            .slot_clusters(index)
            .all(|c| live.fat_entry(c) == FAT_CLUSTER_BAD);
        if !reserved {
            log::warn!("Kept slot {} is not reserved in the live superblock, marking it bad", index);
            store.mark_slot_bad(&mut live, index);
        }
    }

    log::info!("{} new slots need to be allocated for isfshax", needed);

    let mut remaining_good = 0usize;
    for index in (0..geometry.slot_count).rev() {
        if !store.check_slot(index) {
            continue;
        }
        // Defective, or already holding an isfshax copy
        if live.slot_marked_bad(&geometry, index)
            || slots[needed..].iter().any(|r| r.slot as u32 == index)
        {
            continue;
        }

        match SlotRecord::claimed(index) {
            Some(rec) if needed > 0 => {
                store.mark_slot_bad(&mut live, index);
                needed -= 1;
                slots[needed] = rec;
                log::info!("Allocated slot {} for isfshax", index);
            }
            _ => remaining_good += 1,
        }
    }

    if needed > 0 || remaining_good < MIN_GOOD_SLOTS {
        log::error!(
            "The nand contains too many bad superblock slots, cannot safely proceed ({} good)",
            remaining_good
        );
        return Err(IsfshaxError::InsufficientFreeSlots {
            remaining: remaining_good,
            required: MIN_GOOD_SLOTS,
        });
    }

    Ok(AllocationPlan {
        slots,
        live,
        newly_allocated,
        kept,
        remaining_good,
    })
}
