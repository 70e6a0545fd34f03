//! boot1 version lookup
//!
//! SEEPROM carries two 16-byte boot1 parameter records, AES-128-CBC
//! encrypted with the OTP SEEPROM key and a zero IV. Decrypted layout
//! (big-endian):
//!   +----------------------+ 0x0
//!   | version              | 2
//!   | sector               | 2
//!   | empty                | 8
//!   | crc32(bytes 0..12)   | 4
//!   +----------------------+ 0x10
//!
//! The installed version is the highest one among records whose CRC holds.

use aes::Aes128;
use cbc::cipher::block_padding::{NoPadding, UnpadError};
use cbc::cipher::{BlockDecryptMut, KeyIvInit};

type Aes128CbcDec = cbc::Decryptor<Aes128>;

pub const PARAMS_RECORD_SIZE: usize = 0x10;
pub const PARAMS_SIZE: usize = PARAMS_RECORD_SIZE * 2;

/// Source of the installed boot1 version.
pub trait Boot1Source {
    /// `None` if no valid version can be determined.
    fn boot1_version(&mut self) -> Option<u16>;
}

/// boot1 version from the encrypted SEEPROM parameter block.
pub struct SeepromBoot1 {
    key: [u8; 16],
    params: [u8; PARAMS_SIZE],
}

impl SeepromBoot1 {
    pub fn new(seeprom_key: [u8; 16], encrypted_params: [u8; PARAMS_SIZE]) -> Self {
        Self {
            key: seeprom_key,
            params: encrypted_params,
        }
    }
}

impl Boot1Source for SeepromBoot1 {
    fn boot1_version(&mut self) -> Option<u16> {
        let mut plain = self.params;
        decrypt_cbc_zero_iv(&self.key, &mut plain).ok()?;
        newest_version(&plain)
    }
}

/// Decrypt `data` in place with AES-128-CBC and an all-zero IV.
///
/// `data` must be a whole number of 16-byte blocks.
pub fn decrypt_cbc_zero_iv(key: &[u8; 16], data: &mut [u8]) -> Result<(), UnpadError> {
    Aes128CbcDec::new(&(*key).into(), &[0u8; 16].into())
        .decrypt_padded_mut::<NoPadding>(data)
        .map(|_| ())
}

/// Highest version among CRC-valid plaintext records.
pub fn newest_version(plain: &[u8; PARAMS_SIZE]) -> Option<u16> {
    plain
        .chunks_exact(PARAMS_RECORD_SIZE)
        .filter_map(|rec| {
            let stored = u32::from_be_bytes([rec[12], rec[13], rec[14], rec[15]]);
            if crc32(&rec[..12]) != stored {
                return None;
            }
            Some(u16::from_be_bytes([rec[0], rec[1]]))
        })
        .max()
}

/// CRC32 (IEEE 802.3 polynomial) - allocation-free implementation
pub fn crc32(data: &[u8]) -> u32 {
    const POLYNOMIAL: u32 = 0xEDB88320;
    let mut crc = 0xFFFF_FFFFu32;

    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ POLYNOMIAL;
            } else {
                crc >>= 1;
            }
        }
    }

    !crc
}
