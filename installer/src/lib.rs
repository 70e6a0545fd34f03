//! isfshax installer
//!
//! The install/uninstall protocols for the isfshax crafted superblocks,
//! written against `isfshax_core::SuperblockStore`:
//! - `image`: crafted image + detached SHA-1 digest, verified before any write
//! - `allocator`: which physical slots hold the redundant copies
//! - `install` / `uninstall`: the protocols themselves
//! - `compat`: preflight check gating which protocol the menu offers

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod allocator;
pub mod compat;
pub mod config;
pub mod error;
pub mod image;
pub mod install;
pub mod uninstall;

pub use allocator::AllocationPlan;
pub use compat::{
    check, CompatibilityReport, ConsoleClass, HardwareIds, HardwareInfo, InstallState, InstallStatus,
};
pub use config::{InstallerConfig, MIN_GOOD_SLOTS, REQUIRED_BOOT1_VERSION};
pub use error::IsfshaxError;
pub use image::{load_and_verify, ImageSource};
pub use install::{install, InstallReport, SlotWrite};
pub use uninstall::{uninstall, ErasedSlot, UninstallReport};
