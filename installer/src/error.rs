// Installer error type

use alloc::string::String;

use isfshax_core::layout::HASH_SIZE;
use isfshax_core::{RecordError, StoreError};

/// Every way an install, uninstall or image load can fail.
///
/// The first six kinds are raised before the store is touched; only
/// `LiveSuperblockCommitFailed` and `NoSlotWritten` can leave it modified.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IsfshaxError {
    #[error("failed to open {path}")]
    MissingFile { path: String },

    #[error("{path} is {actual} bytes, expected {expected}")]
    SizeMismatch {
        path: String,
        expected: usize,
        actual: usize,
    },

    #[error(
        "checksum verification failed: expected {}, computed {}",
        hex::encode(.expected),
        hex::encode(.computed)
    )]
    IntegrityMismatch {
        expected: [u8; HASH_SIZE],
        computed: [u8; HASH_SIZE],
    },

    #[error("failed to find an unpatched isfs superblock: {0}")]
    NoUnpatchedSuperblock(#[source] StoreError),

    #[error("failed to find isfshax superblock: {0}")]
    NotInstalled(#[source] StoreError),

    #[error("isfshax record is corrupt: {0}")]
    CorruptRecord(#[source] RecordError),

    #[error("only {remaining} good superblock slots would remain, at least {required} are needed")]
    InsufficientFreeSlots { remaining: usize, required: usize },

    #[error("failed to commit updated superblock (copy {attempt}): {source}")]
    LiveSuperblockCommitFailed { attempt: u8, source: StoreError },

    #[error("couldn't write to any of the {attempted} isfshax slots")]
    NoSlotWritten { attempted: usize },
}

impl IsfshaxError {
    /// Whether the store may have been modified when this error was returned.
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            Self::LiveSuperblockCommitFailed { .. } | Self::NoSlotWritten { .. }
        )
    }
}
