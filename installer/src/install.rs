//! isfshax installation
//!
//! 1. load and verify the crafted image (no store access before this)
//! 2. import the record of a previous install, if any
//! 3. load the live superblock and allocate slots against it
//! 4. commit the live superblock twice
//! 5. write one stamped crafted copy per slot
//!
//! Partial success in step 5 is accepted: any one readable copy with the
//! highest generation is enough for the install to be present.

use isfshax_core::{
    IsfshaxInfo, SlotRecord, StoreError, Superblock, SuperblockStore, GEN_FIRST, REDUNDANCY,
};

use crate::allocator::{self, AllocationPlan};
use crate::config::InstallerConfig;
use crate::error::IsfshaxError;
use crate::image::{self, ImageSource};

/// Number of times an updated live superblock is committed.
pub const LIVE_COMMIT_COPIES: u8 = 2;

/// Outcome of one crafted copy write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotWrite {
    pub position: usize,
    pub slot: u8,
    pub generation: u32,
    pub ok: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub slots: [SlotRecord; REDUNDANCY],
    pub writes: [SlotWrite; REDUNDANCY],
    /// Copies that were written successfully.
    pub written: usize,
    pub newly_allocated: usize,
    pub kept: usize,
    pub remaining_good: usize,
}

/// Record of the newest installed copy, if one is present.
///
/// Only `StoreError::NotFound` means absence. A present but invalid record
/// is `CorruptRecord`; any other lookup failure is `NotInstalled`, since
/// claiming fresh slots over an unreadable install would orphan it.
pub(crate) fn current_install<S: SuperblockStore + ?Sized>(
    store: &mut S,
) -> Result<Option<IsfshaxInfo>, IsfshaxError> {
    match store.load_super(GEN_FIRST, u32::MAX) {
        Ok(sb) => {
            let info = sb.isfshax_info();
            info.validate(store.geometry().slot_count)
                .map_err(IsfshaxError::CorruptRecord)?;
            Ok(Some(info))
        }
        Err(StoreError::NotFound) => Ok(None),
        Err(e) => {
            log::error!("Failed to read isfshax superblock range ({})", e);
            Err(IsfshaxError::NotInstalled(e))
        }
    }
}

/// Commit `live` `LIVE_COMMIT_COPIES` times, stopping at the first failure.
pub(crate) fn commit_live<S: SuperblockStore + ?Sized>(
    store: &mut S,
    live: &mut Superblock,
) -> Result<(), IsfshaxError> {
    log::info!("Writing updated isfs superblock");
    for attempt in 1..=LIVE_COMMIT_COPIES {
        store.commit_super(live).map_err(|source| {
            log::error!("Failed to commit updated superblock ({})", source);
            IsfshaxError::LiveSuperblockCommitFailed { attempt, source }
        })?;
        log::debug!("committed live superblock generation {}", live.generation());
    }
    Ok(())
}

/// Install isfshax, or refresh an existing install.
pub fn install<S, I>(
    store: &mut S,
    images: &mut I,
    config: &InstallerConfig,
) -> Result<InstallReport, IsfshaxError>
where
    S: SuperblockStore + ?Sized,
    I: ImageSource + ?Sized,
{
    log::info!("Loading and verifying crafted isfshax superblock");
    let mut crafted = image::load_and_verify(images, config)?;

    log::info!("Looking for previous isfshax installs...");
    let current = current_install(store)?;
    let mut working = match current {
        Some(info) => {
            log::info!("Found previous install (generation base {:#010x})", info.generationbase);
            info
        }
        None => {
            log::info!("No previous install found");
            IsfshaxInfo::new()
        }
    };

    let live = store
        .load_super(0, GEN_FIRST)
        .map_err(IsfshaxError::NoUnpatchedSuperblock)?;

    let AllocationPlan {
        slots,
        mut live,
        newly_allocated,
        kept,
        remaining_good,
    } = allocator::plan(store, live, current.as_ref())?;
    working.slots = slots;

    commit_live(store, &mut live)?;

    log::info!("Writing crafted isfshax superblocks");
    let mut writes = [SlotWrite::default(); REDUNDANCY];
    let mut written = 0usize;
    for (position, record) in slots.iter().enumerate() {
        working.index = position as u32;
        working.generation = working.generation_of(position);
        crafted.stamp(&working);

        let ok = match store.write_super(crafted.image(), record.slot as u32) {
            Ok(()) => {
                log::info!("Writing isfshax superblock to slot {}... OK", record.slot);
                written += 1;
                true
            }
            Err(e) => {
                log::warn!("Writing isfshax superblock to slot {}... Fail ({})", record.slot, e);
                false
            }
        };
        writes[position] = SlotWrite {
            position,
            slot: record.slot,
            generation: working.generation,
            ok,
        };
    }

    if written == 0 {
        log::error!("Couldn't write to any isfshax slot!");
        return Err(IsfshaxError::NoSlotWritten {
            attempted: REDUNDANCY,
        });
    }

    log::info!("SUCCESS ({}/{} copies written)", written, REDUNDANCY);
    Ok(InstallReport {
        slots,
        writes,
        written,
        newly_allocated,
        kept,
        remaining_good,
    })
}
