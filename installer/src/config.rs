// Installer configuration

use alloc::string::String;

/// Minimum number of usable native superblock slots that must remain after
/// isfshax claims its slots. Not configurable.
pub const MIN_GOOD_SLOTS: usize = 16;

/// The only boot1 version the crafted superblock is known to work with.
pub const REQUIRED_BOOT1_VERSION: u16 = 8377;

pub const DEFAULT_IMAGE_PATH: &str = "superblock.img";
pub const DEFAULT_HASH_PATH: &str = "superblock.img.sha";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerConfig {
    /// Crafted superblock image on removable storage.
    pub image_path: String,
    /// Detached SHA-1 digest of `image_path`.
    pub hash_path: String,
    pub required_boot1_version: u16,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            image_path: String::from(DEFAULT_IMAGE_PATH),
            hash_path: String::from(DEFAULT_HASH_PATH),
            required_boot1_version: REQUIRED_BOOT1_VERSION,
        }
    }
}
