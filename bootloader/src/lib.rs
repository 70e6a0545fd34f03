//! isfshax installer firmware shell
//!
//! Board bring-up, the SD card driver and the NAND/ISFS driver live in the
//! board support code; it implements `Platform` and calls `firmware_main`.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod gui;
#[cfg(feature = "heap")]
pub mod heap;
pub mod menu;
pub mod platform;

pub use gui::Exit;
pub use platform::{Button, Buttons, Parts, Platform};

use isfshax_core::logger;
use isfshax_installer::InstallerConfig;

/// Entry point once the board is up. Returns when the user powers off.
pub fn firmware_main<P: Platform + ?Sized>(platform: &mut P) -> Exit {
    #[cfg(feature = "heap")]
    heap::init();

    if logger::init(log::LevelFilter::Info).is_err() {
        log::warn!("logger already installed");
    }
    log::info!("isfshax installer v{}", env!("CARGO_PKG_VERSION"));

    gui::run(platform, &InstallerConfig::default())
}
