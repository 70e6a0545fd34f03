//! Fixed ISFS / isfshax layout constants and superblock slot geometry.
//!
//! All multi-byte on-flash fields are big-endian.

/// Magic of a valid isfshax info record ("HAXX").
pub const ISFSHAX_MAGIC: u32 = 0x4841_5858;

/// Number of redundant crafted superblock copies.
pub const REDUNDANCY: usize = 4;

/// First generation of the reserved isfshax range.
pub const GEN_FIRST: u32 = 0xFFFF_7FFF;
/// Size of the reserved isfshax generation range.
pub const GEN_RANGE: u32 = 0x100;

/// Native superblock magic.
pub const SUPER_MAGIC: [u8; 4] = *b"SFS!";
/// Size of one superblock image (one slot worth of data).
pub const SUPER_SIZE: usize = 0x40000;

/// Clusters addressed by one superblock FAT.
pub const CLUSTER_COUNT: usize = 0x8000;
/// Number of FST entries in a superblock.
pub const FST_COUNT: usize = 6143;
/// Size of one FST entry.
pub const FST_ENTRY_SIZE: usize = 0x20;

pub const GENERATION_OFFSET: usize = 4;
pub const FAT_OFFSET: usize = 12;
pub const FST_OFFSET: usize = FAT_OFFSET + CLUSTER_COUNT * 2;
/// Offset of the isfshax info record inside a crafted superblock.
pub const INFO_OFFSET: usize = FST_OFFSET + FST_COUNT * FST_ENTRY_SIZE;
/// Size of the isfshax info record.
pub const INFO_SIZE: usize = 0x14;

const _: () = assert!(INFO_OFFSET == 0x3FFEC);
const _: () = assert!(INFO_OFFSET + INFO_SIZE == SUPER_SIZE);

/// Size of the detached image digest (SHA-1).
pub const HASH_SIZE: usize = 20;

/// FAT cluster markers
pub const FAT_CLUSTER_LAST: u16 = 0xFFFB;
pub const FAT_CLUSTER_RESERVED: u16 = 0xFFFC;
pub const FAT_CLUSTER_BAD: u16 = 0xFFFD;
pub const FAT_CLUSTER_EMPTY: u16 = 0xFFFE;

/// Highest slot index the packed 6-bit slot field can hold, plus one.
pub const SLOT_INDEX_LIMIT: u32 = 1 << 6;

/// Superblock area geometry of an ISFS volume.
///
/// Slots occupy the last `slot_count * blocks_per_slot` blocks of the
/// device, slot 0 first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub block_count: u32,
    pub slot_count: u32,
    pub blocks_per_slot: u32,
    pub clusters_per_block: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GeometryError {
    #[error("superblock area ({slots} slots x {blocks_per_slot} blocks) exceeds {block_count} blocks")]
    AreaTooLarge {
        slots: u32,
        blocks_per_slot: u32,
        block_count: u32,
    },
    #[error("{clusters} clusters do not fit in a {max}-entry FAT")]
    TooManyClusters { clusters: u64, max: usize },
    #[error("geometry field is zero")]
    Zero,
}

impl Geometry {
    /// Wii U SLC volume: 4096 blocks of 8 clusters, 64 two-block slots.
    pub const SLC: Geometry = Geometry {
        block_count: 0x1000,
        slot_count: 64,
        blocks_per_slot: 2,
        clusters_per_block: 8,
    };

    pub fn new(
        block_count: u32,
        slot_count: u32,
        blocks_per_slot: u32,
        clusters_per_block: u32,
    ) -> Result<Self, GeometryError> {
        if block_count == 0 || slot_count == 0 || blocks_per_slot == 0 || clusters_per_block == 0 {
            return Err(GeometryError::Zero);
        }
        let area = slot_count as u64 * blocks_per_slot as u64;
        if area > block_count as u64 {
            return Err(GeometryError::AreaTooLarge {
                slots: slot_count,
                blocks_per_slot,
                block_count,
            });
        }
        let clusters = block_count as u64 * clusters_per_block as u64;
        if clusters > CLUSTER_COUNT as u64 {
            return Err(GeometryError::TooManyClusters {
                clusters,
                max: CLUSTER_COUNT,
            });
        }
        Ok(Self {
            block_count,
            slot_count,
            blocks_per_slot,
            clusters_per_block,
        })
    }

    /// First flash block backing `slot`.
    pub fn slot_first_block(&self, slot: u32) -> u32 {
        self.block_count - (self.slot_count - slot) * self.blocks_per_slot
    }

    /// Flash blocks backing `slot`.
    pub fn slot_blocks(&self, slot: u32) -> core::ops::Range<u32> {
        let first = self.slot_first_block(slot);
        first..first + self.blocks_per_slot
    }

    pub fn clusters_per_slot(&self) -> u32 {
        self.blocks_per_slot * self.clusters_per_block
    }

    /// FAT clusters covering `slot`.
    pub fn slot_clusters(&self, slot: u32) -> core::ops::Range<usize> {
        let first = (self.slot_first_block(slot) * self.clusters_per_block) as usize;
        first..first + self.clusters_per_slot() as usize
    }

    pub fn contains_slot(&self, slot: u32) -> bool {
        slot < self.slot_count
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::SLC
    }
}
