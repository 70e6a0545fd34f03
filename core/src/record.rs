//! isfshax info record codec
//!
//! Layout (big-endian):
//!   +----------------------+ 0x00
//!   | magic = 0x48415858   | 4
//!   | slots[4]             | 4  packed: bit0 bad, bit1 ecc_correctable, bits2-7 slot
//!   | generation           | 4
//!   | generationbase       | 4
//!   | index                | 4
//!   +----------------------+ 0x14

use crate::layout::{GEN_FIRST, GEN_RANGE, INFO_SIZE, ISFSHAX_MAGIC, REDUNDANCY, SLOT_INDEX_LIMIT};

/// One redundant copy's slot bookkeeping, packed into a single byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotRecord {
    /// Slot was already defective before isfshax claimed it.
    pub bad: bool,
    /// Advisory only.
    pub ecc_correctable: bool,
    /// Physical superblock slot index (0..=63).
    pub slot: u8,
}

impl SlotRecord {
    const BAD: u8 = 1 << 0;
    const ECC_CORRECTABLE: u8 = 1 << 1;
    const SLOT_SHIFT: u8 = 2;

    /// Record for a freshly claimed, healthy slot.
    ///
    /// Returns `None` if `slot` doesn't fit the 6-bit field.
    pub fn claimed(slot: u32) -> Option<Self> {
        if slot >= SLOT_INDEX_LIMIT {
            return None;
        }
        Some(Self {
            bad: false,
            ecc_correctable: false,
            slot: slot as u8,
        })
    }

    pub fn pack(&self) -> u8 {
        let mut b = (self.slot & 0x3F) << Self::SLOT_SHIFT;
        if self.bad {
            b |= Self::BAD;
        }
        if self.ecc_correctable {
            b |= Self::ECC_CORRECTABLE;
        }
        b
    }

    pub fn unpack(b: u8) -> Self {
        Self {
            bad: b & Self::BAD != 0,
            ecc_correctable: b & Self::ECC_CORRECTABLE != 0,
            slot: b >> Self::SLOT_SHIFT,
        }
    }
}

/// Why an isfshax info record can't be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("bad isfshax data magic {found:08X}")]
    BadMagic { found: u32 },
    #[error("slot {slot} is claimed twice")]
    DuplicateSlot { slot: u8 },
    #[error("slot {slot} is outside the {slot_count} available slots")]
    SlotOutOfRange { slot: u8, slot_count: u32 },
    #[error("generation base {generationbase:#010x} outside the reserved range")]
    GenerationOutOfRange { generationbase: u32 },
    #[error("copy index {index} out of range")]
    BadIndex { index: u32 },
}

/// The fixed 20-byte record embedded in every crafted superblock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsfshaxInfo {
    pub magic: u32,
    pub slots: [SlotRecord; REDUNDANCY],
    /// Generation of this particular copy.
    pub generation: u32,
    /// Generation of copy 0; copy `i` uses `generationbase + i`.
    pub generationbase: u32,
    /// Which redundant copy this image is.
    pub index: u32,
}

impl IsfshaxInfo {
    /// Fresh working record for a new install.
    pub fn new() -> Self {
        Self {
            magic: ISFSHAX_MAGIC,
            slots: [SlotRecord::default(); REDUNDANCY],
            generation: GEN_FIRST,
            generationbase: GEN_FIRST,
            index: 0,
        }
    }

    pub fn encode(&self) -> [u8; INFO_SIZE] {
        let mut out = [0u8; INFO_SIZE];
        out[0..4].copy_from_slice(&self.magic.to_be_bytes());
        for (i, s) in self.slots.iter().enumerate() {
            out[4 + i] = s.pack();
        }
        out[8..12].copy_from_slice(&self.generation.to_be_bytes());
        out[12..16].copy_from_slice(&self.generationbase.to_be_bytes());
        out[16..20].copy_from_slice(&self.index.to_be_bytes());
        out
    }

    pub fn decode(raw: &[u8; INFO_SIZE]) -> Self {
        let word = |o: usize| u32::from_be_bytes([raw[o], raw[o + 1], raw[o + 2], raw[o + 3]]);
        let mut slots = [SlotRecord::default(); REDUNDANCY];
        for (i, s) in slots.iter_mut().enumerate() {
            *s = SlotRecord::unpack(raw[4 + i]);
        }
        Self {
            magic: word(0),
            slots,
            generation: word(8),
            generationbase: word(12),
            index: word(16),
        }
    }

    pub fn has_magic(&self) -> bool {
        self.magic == ISFSHAX_MAGIC
    }

    /// Check the record against a store with `slot_count` slots.
    pub fn validate(&self, slot_count: u32) -> Result<(), RecordError> {
        if !self.has_magic() {
            return Err(RecordError::BadMagic { found: self.magic });
        }
        for (i, s) in self.slots.iter().enumerate() {
            if s.slot as u32 >= slot_count {
                return Err(RecordError::SlotOutOfRange {
                    slot: s.slot,
                    slot_count,
                });
            }
            if self.slots[..i].iter().any(|o| o.slot == s.slot) {
                return Err(RecordError::DuplicateSlot { slot: s.slot });
            }
        }
        let base = self.generationbase as u64;
        let lo = GEN_FIRST as u64;
        let hi = lo + GEN_RANGE as u64;
        if base < lo || base + REDUNDANCY as u64 > hi {
            return Err(RecordError::GenerationOutOfRange {
                generationbase: self.generationbase,
            });
        }
        if self.index as usize >= REDUNDANCY {
            return Err(RecordError::BadIndex { index: self.index });
        }
        Ok(())
    }

    /// Generation the copy at `position` is written with.
    pub fn generation_of(&self, position: usize) -> u32 {
        self.generationbase.wrapping_add(position as u32)
    }
}

impl Default for IsfshaxInfo {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> IsfshaxInfo {
        IsfshaxInfo {
            magic: ISFSHAX_MAGIC,
            slots: [
                SlotRecord::claimed(60).unwrap(),
                SlotRecord::claimed(61).unwrap(),
                SlotRecord {
                    bad: true,
                    ecc_correctable: false,
                    slot: 62,
                },
                SlotRecord::claimed(63).unwrap(),
            ],
            generation: GEN_FIRST + 2,
            generationbase: GEN_FIRST,
            index: 2,
        }
    }

    #[test]
    fn test_slot_byte_layout() {
        let rec = SlotRecord {
            bad: true,
            ecc_correctable: true,
            slot: 63,
        };
        assert_eq!(rec.pack(), 0xFF);
        assert_eq!(SlotRecord::claimed(5).unwrap().pack(), 5 << 2);
        assert_eq!(
            SlotRecord::unpack(0b0000_0101),
            SlotRecord {
                bad: true,
                ecc_correctable: false,
                slot: 1
            }
        );
    }

    #[test]
    fn test_claimed_rejects_unencodable_slot() {
        assert!(SlotRecord::claimed(63).is_some());
        assert!(SlotRecord::claimed(64).is_none());
    }

    #[test]
    fn test_encode_is_big_endian() {
        let raw = sample().encode();
        assert_eq!(&raw[0..4], &[0x48, 0x41, 0x58, 0x58]);
        assert_eq!(raw[4], 60 << 2);
        assert_eq!(raw[6], (62 << 2) | 1);
        assert_eq!(&raw[8..12], &(GEN_FIRST + 2).to_be_bytes());
        assert_eq!(&raw[16..20], &[0, 0, 0, 2]);
        assert_eq!(IsfshaxInfo::decode(&raw), sample());
    }

    #[test]
    fn test_validate_accepts_sample() {
        assert_eq!(sample().validate(64), Ok(()));
    }

    #[test]
    fn test_validate_bad_magic() {
        let mut info = sample();
        info.magic = 0xDEAD_BEEF;
        assert_eq!(
            info.validate(64),
            Err(RecordError::BadMagic { found: 0xDEAD_BEEF })
        );
    }

    #[test]
    fn test_validate_duplicate_slot() {
        let mut info = sample();
        info.slots[3].slot = 60;
        assert_eq!(info.validate(64), Err(RecordError::DuplicateSlot { slot: 60 }));
    }

    #[test]
    fn test_validate_slot_out_of_range() {
        assert_eq!(
            sample().validate(62),
            Err(RecordError::SlotOutOfRange {
                slot: 62,
                slot_count: 62
            })
        );
    }

    #[test]
    fn test_validate_generation_range() {
        let mut info = sample();
        info.generationbase = 5;
        assert!(matches!(
            info.validate(64),
            Err(RecordError::GenerationOutOfRange { .. })
        ));
        info.generationbase = GEN_FIRST + GEN_RANGE - REDUNDANCY as u32;
        assert_eq!(info.validate(64), Ok(()));
        info.generationbase += 1;
        assert!(info.validate(64).is_err());
    }
}
