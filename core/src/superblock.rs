//! Owned superblock images
//!
//! A `Superblock` is one slot's worth of bytes (`SUPER_SIZE`). Only the
//! header, the FAT and the isfshax tail are interpreted here; the FST area
//! is carried opaquely.

use alloc::boxed::Box;
use alloc::vec;

use crate::layout::{
    Geometry, CLUSTER_COUNT, FAT_CLUSTER_BAD, FAT_OFFSET, GENERATION_OFFSET, INFO_OFFSET,
    INFO_SIZE, SUPER_MAGIC, SUPER_SIZE,
};
use crate::record::IsfshaxInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("superblock image is {actual} bytes, expected {expected}")]
    WrongSize { expected: usize, actual: usize },
}

/// One superblock-sized image.
#[derive(Clone, PartialEq, Eq)]
pub struct Superblock {
    data: Box<[u8]>,
}

impl core::fmt::Debug for Superblock {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Superblock")
            .field("magic", &self.magic())
            .field("generation", &self.generation())
            .finish()
    }
}

impl Superblock {
    /// Empty native superblock: magic set, generation 0, FAT zeroed.
    pub fn new() -> Self {
        let mut data = vec![0u8; SUPER_SIZE].into_boxed_slice();
        data[0..4].copy_from_slice(&SUPER_MAGIC);
        Self { data }
    }

    pub fn from_bytes(data: Box<[u8]>) -> Result<Self, LayoutError> {
        if data.len() != SUPER_SIZE {
            return Err(LayoutError::WrongSize {
                expected: SUPER_SIZE,
                actual: data.len(),
            });
        }
        Ok(Self { data })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn magic(&self) -> [u8; 4] {
        [self.data[0], self.data[1], self.data[2], self.data[3]]
    }

    pub fn has_magic(&self) -> bool {
        self.magic() == SUPER_MAGIC
    }

    pub fn generation(&self) -> u32 {
        let o = GENERATION_OFFSET;
        u32::from_be_bytes([self.data[o], self.data[o + 1], self.data[o + 2], self.data[o + 3]])
    }

    pub fn set_generation(&mut self, generation: u32) {
        let o = GENERATION_OFFSET;
        self.data[o..o + 4].copy_from_slice(&generation.to_be_bytes());
    }

    /// FAT entry for `cluster`.
    pub fn fat_entry(&self, cluster: usize) -> u16 {
        debug_assert!(cluster < CLUSTER_COUNT);
        let o = FAT_OFFSET + cluster * 2;
        u16::from_be_bytes([self.data[o], self.data[o + 1]])
    }

    pub fn set_fat_entry(&mut self, cluster: usize, value: u16) {
        debug_assert!(cluster < CLUSTER_COUNT);
        let o = FAT_OFFSET + cluster * 2;
        self.data[o..o + 2].copy_from_slice(&value.to_be_bytes());
    }

    /// Set every FAT entry covering `slot` to `value`.
    pub fn set_slot_clusters(&mut self, geometry: &Geometry, slot: u32, value: u16) {
        for cluster in geometry.slot_clusters(slot) {
            self.set_fat_entry(cluster, value);
        }
    }

    /// True if any cluster of `slot` is marked bad in this FAT.
    pub fn slot_marked_bad(&self, geometry: &Geometry, slot: u32) -> bool {
        geometry
            .slot_clusters(slot)
            .any(|c| self.fat_entry(c) == FAT_CLUSTER_BAD)
    }

    pub fn isfshax_info(&self) -> IsfshaxInfo {
        let mut raw = [0u8; INFO_SIZE];
        raw.copy_from_slice(&self.data[INFO_OFFSET..INFO_OFFSET + INFO_SIZE]);
        IsfshaxInfo::decode(&raw)
    }

    pub fn set_isfshax_info(&mut self, info: &IsfshaxInfo) {
        self.data[INFO_OFFSET..INFO_OFFSET + INFO_SIZE].copy_from_slice(&info.encode());
    }
}

impl Default for Superblock {
    fn default() -> Self {
        Self::new()
    }
}

/// A verified crafted image, ready to be stamped per redundant copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CraftedSuperblock(Superblock);

impl CraftedSuperblock {
    pub fn new(image: Superblock) -> Self {
        Self(image)
    }

    /// Embed `info` and set the image generation to `info.generation`.
    pub fn stamp(&mut self, info: &IsfshaxInfo) {
        self.0.set_generation(info.generation);
        self.0.set_isfshax_info(info);
    }

    pub fn image(&self) -> &Superblock {
        &self.0
    }
}
