//! In-memory superblock store
//!
//! Models just enough of the ISFS superblock ring for host testing:
//! sparse slot contents, defective slots, commit rotation that never
//! lands on a slot marked bad in the committed FAT, fault injection and
//! operation counters.

use alloc::collections::{BTreeMap, BTreeSet};

use super::{StoreError, SuperblockStore};
use crate::layout::{
    Geometry, FAT_CLUSTER_BAD, FAT_CLUSTER_EMPTY, FAT_CLUSTER_RESERVED, CLUSTER_COUNT, GEN_FIRST,
};
use crate::superblock::Superblock;

/// Operation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemStoreStats {
    pub commits: usize,
    pub slot_writes: usize,
    pub erases: usize,
}

impl MemStoreStats {
    /// Every operation that programs or erases flash.
    pub fn flash_writes(&self) -> usize {
        self.commits + self.slot_writes + self.erases
    }
}

pub struct MemStore {
    geometry: Geometry,
    slots: BTreeMap<u32, Superblock>,
    /// Physically bad slots: unreadable and marked bad in the live FAT.
    defective: BTreeSet<u32>,
    /// Slots whose copy fails its checksum but aren't marked bad.
    unreadable: BTreeSet<u32>,
    failing_writes: BTreeSet<u32>,
    failing_erases: BTreeSet<u32>,
    commits_left: Option<usize>,
    reserved_read_error: Option<StoreError>,
    last_commit_slot: u32,
    stats: MemStoreStats,
}

impl MemStore {
    /// Freshly formatted volume with generation-1 live superblock.
    pub fn new(geometry: Geometry) -> Self {
        Self::with_defective(geometry, &[])
    }

    /// Freshly formatted volume whose `defective` slots are already marked bad.
    pub fn with_defective(geometry: Geometry, defective: &[u32]) -> Self {
        let mut live = Superblock::new();
        live.set_generation(1);
        let used = (geometry.block_count * geometry.clusters_per_block) as usize;
        for cluster in 0..used.min(CLUSTER_COUNT) {
            live.set_fat_entry(cluster, FAT_CLUSTER_EMPTY);
        }
        for slot in 0..geometry.slot_count {
            let mark = if defective.contains(&slot) {
                FAT_CLUSTER_BAD
            } else {
                FAT_CLUSTER_RESERVED
            };
            live.set_slot_clusters(&geometry, slot, mark);
        }

        let defective: BTreeSet<u32> = defective.iter().copied().collect();
        let home = (0..geometry.slot_count)
            .find(|s| !defective.contains(s))
            .unwrap_or(0);

        let mut slots = BTreeMap::new();
        slots.insert(home, live);

        Self {
            geometry,
            slots,
            defective,
            unreadable: BTreeSet::new(),
            failing_writes: BTreeSet::new(),
            failing_erases: BTreeSet::new(),
            commits_left: None,
            reserved_read_error: None,
            last_commit_slot: home,
            stats: MemStoreStats::default(),
        }
    }

    /// Make slot `index` fail `check_slot` without marking it bad.
    pub fn set_unreadable(&mut self, index: u32) {
        self.unreadable.insert(index);
    }

    /// Make every `write_super` into slot `index` fail.
    pub fn fail_writes_to(&mut self, index: u32) {
        self.failing_writes.insert(index);
    }

    pub fn fail_erase_of(&mut self, block: u32) {
        self.failing_erases.insert(block);
    }

    /// Allow `n` more successful commits, then fail every commit.
    pub fn fail_commits_after(&mut self, n: usize) {
        self.commits_left = Some(n);
    }

    /// Make every lookup in the isfshax generation range fail with `err`.
    pub fn fail_reserved_reads_with(&mut self, err: StoreError) {
        self.reserved_read_error = Some(err);
    }

    pub fn stats(&self) -> MemStoreStats {
        self.stats
    }

    pub fn slot(&self, index: u32) -> Option<&Superblock> {
        self.slots.get(&index)
    }

    /// Place `image` into slot `index` without touching counters.
    pub fn seed_slot(&mut self, index: u32, image: Superblock) {
        self.slots.insert(index, image);
    }

    fn slot_of_block(&self, block: u32) -> Option<u32> {
        let g = &self.geometry;
        let area = g.slot_count * g.blocks_per_slot;
        let start = g.block_count - area;
        if block < start || block >= g.block_count {
            return None;
        }
        Some((block - start) / g.blocks_per_slot)
    }

    fn readable(&self, index: u32) -> bool {
        !self.defective.contains(&index) && !self.unreadable.contains(&index)
    }
}

impl SuperblockStore for MemStore {
    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn load_super(&mut self, min_generation: u32, max_generation: u32)
        -> Result<Superblock, StoreError> {
        if let Some(err) = self.reserved_read_error {
            if max_generation > GEN_FIRST {
                return Err(err);
            }
        }
        self.slots
            .iter()
            .filter(|(index, sb)| {
                let gen = sb.generation();
                self.readable(**index)
                    && sb.has_magic()
                    && gen >= min_generation
                    && gen < max_generation
            })
            .max_by_key(|(_, sb)| sb.generation())
            .map(|(_, sb)| sb.clone())
            .ok_or(StoreError::NotFound)
    }

    fn check_slot(&mut self, index: u32) -> bool {
        self.geometry.contains_slot(index) && self.readable(index)
    }

    fn commit_super(&mut self, live: &mut Superblock) -> Result<(), StoreError> {
        if let Some(left) = self.commits_left.as_mut() {
            if *left == 0 {
                let block = self.geometry.slot_first_block(self.last_commit_slot);
                return Err(StoreError::Io { block });
            }
            *left -= 1;
        }

        let next = live.generation().wrapping_add(1);
        if next >= GEN_FIRST {
            return Err(StoreError::GenerationExhausted);
        }

        let count = self.geometry.slot_count;
        let target = (1..=count)
            .map(|step| (self.last_commit_slot + step) % count)
            .find(|&s| {
                !self.defective.contains(&s)
                    && !self.failing_writes.contains(&s)
                    && !live.slot_marked_bad(&self.geometry, s)
            })
            .ok_or(StoreError::Io { block: 0 })?;

        live.set_generation(next);
        self.slots.insert(target, live.clone());
        self.unreadable.remove(&target);
        self.last_commit_slot = target;
        self.stats.commits += 1;
        Ok(())
    }

    fn write_super(&mut self, image: &Superblock, index: u32) -> Result<(), StoreError> {
        if !self.geometry.contains_slot(index) {
            return Err(StoreError::OutOfRange { slot: index });
        }
        if self.defective.contains(&index) || self.failing_writes.contains(&index) {
            return Err(StoreError::Io {
                block: self.geometry.slot_first_block(index),
            });
        }
        self.slots.insert(index, image.clone());
        self.unreadable.remove(&index);
        self.stats.slot_writes += 1;
        Ok(())
    }

    fn erase_block(&mut self, block: u32) -> Result<(), StoreError> {
        self.stats.erases += 1;
        if self.failing_erases.contains(&block) {
            return Err(StoreError::Io { block });
        }
        if let Some(slot) = self.slot_of_block(block) {
            self.slots.remove(&slot);
        }
        Ok(())
    }
}
