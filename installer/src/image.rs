//! Crafted superblock loading and integrity check
//!
//! The image and its detached SHA-1 digest are read whole from removable
//! storage and compared before anything is allowed near the NAND. Nothing
//! in here touches a `SuperblockStore`.

use alloc::string::String;
use alloc::vec;

use isfshax_core::layout::{HASH_SIZE, SUPER_SIZE};
use isfshax_core::{CraftedSuperblock, Superblock};
use sha1::{Digest, Sha1};

use crate::config::InstallerConfig;
use crate::error::IsfshaxError;

/// Read-only access to files on removable storage.
pub trait ImageSource {
    /// Size of `path` in bytes, `None` if it can't be opened.
    fn size_of(&mut self, path: &str) -> Option<u64>;

    /// Read the start of `path` into `buf`, returning the byte count.
    fn read_into(&mut self, path: &str, buf: &mut [u8]) -> Option<usize>;
}

/// Load the file at `path`, which must be exactly `buf.len()` bytes.
fn load_exact<I: ImageSource + ?Sized>(
    images: &mut I,
    path: &str,
    buf: &mut [u8],
) -> Result<(), IsfshaxError> {
    let missing = || IsfshaxError::MissingFile {
        path: String::from(path),
    };
    let size = images.size_of(path).ok_or_else(missing)?;
    if size != buf.len() as u64 {
        return Err(IsfshaxError::SizeMismatch {
            path: String::from(path),
            expected: buf.len(),
            actual: size as usize,
        });
    }

    let read = images.read_into(path, buf).ok_or_else(missing)?;
    if read != buf.len() {
        return Err(IsfshaxError::SizeMismatch {
            path: String::from(path),
            expected: buf.len(),
            actual: read,
        });
    }
    Ok(())
}

/// Load the crafted image and its digest, and verify one against the other.
pub fn load_and_verify<I: ImageSource + ?Sized>(
    images: &mut I,
    config: &InstallerConfig,
) -> Result<CraftedSuperblock, IsfshaxError> {
    log::info!("Loading {}", config.image_path);
    let mut data = vec![0u8; SUPER_SIZE].into_boxed_slice();
    load_exact(images, &config.image_path, &mut data)?;

    log::info!("Loading {}", config.hash_path);
    let mut expected = [0u8; HASH_SIZE];
    load_exact(images, &config.hash_path, &mut expected)?;

    log::info!("Verifying {} checksum", config.image_path);
    let mut computed = [0u8; HASH_SIZE];
    computed.copy_from_slice(&Sha1::digest(&data));
    if computed != expected {
        log::error!("Checksum verification failed!");
        return Err(IsfshaxError::IntegrityMismatch { expected, computed });
    }

    let image = Superblock::from_bytes(data).map_err(|e| match e {
        isfshax_core::LayoutError::WrongSize { expected, actual } => IsfshaxError::SizeMismatch {
            path: config.image_path.clone(),
            expected,
            actual,
        },
    })?;
    Ok(CraftedSuperblock::new(image))
}
