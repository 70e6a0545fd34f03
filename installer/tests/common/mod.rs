// Shared fixtures for the installer integration tests
#![allow(dead_code)]

use std::collections::BTreeMap;

use isfshax_core::layout::SUPER_SIZE;
use isfshax_core::store::MemStore;
use isfshax_core::{Geometry, Superblock, SuperblockStore, GEN_FIRST};
use isfshax_installer::ImageSource;
use sha1::{Digest, Sha1};

/// Removable storage holding files by path.
#[derive(Default)]
pub struct MemFiles(pub BTreeMap<String, Vec<u8>>);

impl MemFiles {
    /// `superblock.img` filled with `fill` plus its matching digest.
    pub fn with_image(fill: u8) -> Self {
        let mut image = vec![fill; SUPER_SIZE];
        image[0..4].copy_from_slice(b"SFS!");
        let digest = Sha1::digest(&image).to_vec();
        let mut files = BTreeMap::new();
        files.insert("superblock.img".to_string(), image);
        files.insert("superblock.img.sha".to_string(), digest);
        Self(files)
    }

    pub fn image_mut(&mut self) -> &mut Vec<u8> {
        self.0.get_mut("superblock.img").expect("image present")
    }
}

impl ImageSource for MemFiles {
    fn size_of(&mut self, path: &str) -> Option<u64> {
        self.0.get(path).map(|f| f.len() as u64)
    }

    fn read_into(&mut self, path: &str, buf: &mut [u8]) -> Option<usize> {
        let file = self.0.get(path)?;
        let n = file.len().min(buf.len());
        buf[..n].copy_from_slice(&file[..n]);
        Some(n)
    }
}

/// Geometry with `slot_count` two-block slots at the end of an SLC-sized device.
pub fn geometry(slot_count: u32) -> Geometry {
    Geometry::new(0x1000, slot_count, 2, 8).expect("valid geometry")
}

pub fn live(store: &mut MemStore) -> Superblock {
    store.load_super(0, GEN_FIRST).expect("live superblock")
}

/// FAT entries of the whole superblock area.
pub fn slot_area_fat(sb: &Superblock, g: &Geometry) -> Vec<u16> {
    (0..g.slot_count)
        .flat_map(|s| g.slot_clusters(s))
        .map(|c| sb.fat_entry(c))
        .collect()
}
