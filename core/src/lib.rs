//! isfshax core - on-flash formats and the superblock store seam
//!
//! Everything the install/uninstall protocols need to know about the ISFS
//! superblock ring without reimplementing it:
//! - `layout`: fixed sizes, offsets, reserved generation range, slot geometry
//! - `record`: the 20-byte isfshax info record and its packed slot bytes
//! - `superblock`: owned superblock images and their FAT view
//! - `store`: the `SuperblockStore` trait (plus `MemStore` behind `mem-store`)
//! - `boot1`: boot1 version lookup from the encrypted SEEPROM parameters
//! - `logger`: ring-buffer sink for the `log` facade

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod boot1;
pub mod layout;
pub mod logger;
pub mod record;
pub mod store;
pub mod superblock;

pub use layout::{Geometry, GEN_FIRST, GEN_RANGE, INFO_OFFSET, ISFSHAX_MAGIC, REDUNDANCY, SUPER_SIZE};
pub use record::{IsfshaxInfo, RecordError, SlotRecord};
pub use store::{StoreError, SuperblockStore};
pub use superblock::{CraftedSuperblock, LayoutError, Superblock};
