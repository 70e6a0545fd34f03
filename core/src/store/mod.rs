//! Superblock store seam
//!
//! The on-flash ring of ISFS superblocks is owned by the platform. The
//! install/uninstall protocols only see it through `SuperblockStore`, and
//! work on owned `Superblock` values returned by `load_super`.

#[cfg(any(test, feature = "mem-store"))]
pub mod mem;

#[cfg(any(test, feature = "mem-store"))]
pub use mem::MemStore;

use crate::layout::{Geometry, FAT_CLUSTER_BAD};
use crate::superblock::Superblock;

/// Failure of a single store primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("no superblock found in the requested generation range")]
    NotFound,
    #[error("flash I/O error at block {block}")]
    Io { block: u32 },
    #[error("uncorrectable ECC error at block {block}")]
    Ecc { block: u32 },
    #[error("superblock generation exhausted")]
    GenerationExhausted,
    #[error("slot {slot} out of range")]
    OutOfRange { slot: u32 },
}

/// Primitives over the on-flash superblock ring.
///
/// Every call blocks until the flash operation completes.
pub trait SuperblockStore {
    fn geometry(&self) -> Geometry;

    /// Newest superblock with `min_generation <= generation < max_generation`.
    fn load_super(&mut self, min_generation: u32, max_generation: u32)
        -> Result<Superblock, StoreError>;

    /// Whether slot `index` holds a structurally valid superblock copy.
    fn check_slot(&mut self, index: u32) -> bool;

    /// Reserve slot `index` in `live` so the live allocator never reuses it.
    fn mark_slot_bad(&self, live: &mut Superblock, index: u32) {
        live.set_slot_clusters(&self.geometry(), index, FAT_CLUSTER_BAD);
    }

    /// Write `live` as the next generation of the live filesystem.
    ///
    /// On success `live`'s generation is the one that was written.
    fn commit_super(&mut self, live: &mut Superblock) -> Result<(), StoreError>;

    /// Write `image` verbatim into slot `index`.
    fn write_super(&mut self, image: &Superblock, index: u32) -> Result<(), StoreError>;

    fn erase_block(&mut self, block: u32) -> Result<(), StoreError>;
}
