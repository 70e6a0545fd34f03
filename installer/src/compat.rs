//! Preflight compatibility check
//!
//! Decides which of install/uninstall the menu may offer. Read-only: the
//! store is only asked to load, never to write.

use bitflags::bitflags;
use isfshax_core::boot1::Boot1Source;
use isfshax_core::SuperblockStore;

use crate::config::InstallerConfig;
use crate::error::IsfshaxError;
use crate::install::current_install;

/// Board/ASIC identifiers of the running console.
pub trait HardwareInfo {
    /// SEEPROM board config board type.
    fn board_type(&self) -> u16;
    /// SEEPROM board config console type.
    fn console_type(&self) -> u16;
    /// ASIC revision register.
    fn asic_revision(&self) -> u32;
}

/// Plain snapshot of the identifiers, for platforms that read them once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HardwareIds {
    pub board_type: u16,
    pub console_type: u16,
    pub asic_revision: u32,
}

impl HardwareInfo for HardwareIds {
    fn board_type(&self) -> u16 {
        self.board_type
    }

    fn console_type(&self) -> u16 {
        self.console_type
    }

    fn asic_revision(&self) -> u32 {
        self.asic_revision
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleClass {
    Retail,
    Unsupported,
}

impl ConsoleClass {
    pub fn classify<H: HardwareInfo + ?Sized>(hw: &H) -> Self {
        let asicrev = hw.asic_revision();
        if hw.board_type() == 0x4346
            || hw.console_type() == 1
            || (asicrev >> 16) == 0xCAFE
            || (asicrev & 0xFF) >= 0x30
        {
            Self::Retail
        } else {
            Self::Unsupported
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InstallStatus: u8 {
        const INSTALL_POSSIBLE = 1 << 0;
        const REMOVAL_POSSIBLE = 1 << 1;
    }
}

impl InstallStatus {
    pub fn can_install(&self) -> bool {
        self.contains(Self::INSTALL_POSSIBLE)
    }

    pub fn can_remove(&self) -> bool {
        self.contains(Self::REMOVAL_POSSIBLE)
    }
}

/// What the isfshax generation range holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    Absent,
    Installed,
    /// A crafted copy is present but its record fails validation.
    Corrupt,
    /// The range could not be read.
    Unreadable,
}

impl InstallState {
    /// Same lookup and validation as the install import and uninstall.
    pub fn detect<S: SuperblockStore + ?Sized>(store: &mut S) -> Self {
        match current_install(store) {
            Ok(Some(_)) => Self::Installed,
            Ok(None) => Self::Absent,
            Err(IsfshaxError::CorruptRecord(_)) => Self::Corrupt,
            Err(_) => Self::Unreadable,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::Absent => "Not installed",
            Self::Installed => "Is installed",
            Self::Corrupt => "Corrupt install record",
            Self::Unreadable => "Unreadable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompatibilityReport {
    pub console: ConsoleClass,
    pub boot1_version: Option<u16>,
    pub state: InstallState,
    pub status: InstallStatus,
}

impl CompatibilityReport {
    pub fn installed(&self) -> bool {
        self.state == InstallState::Installed
    }
}

pub fn check<S, H, B>(
    store: &mut S,
    hw: &H,
    boot1: &mut B,
    config: &InstallerConfig,
) -> CompatibilityReport
where
    S: SuperblockStore + ?Sized,
    H: HardwareInfo + ?Sized,
    B: Boot1Source + ?Sized,
{
    let console = ConsoleClass::classify(hw);
    let boot1_version = boot1.boot1_version();
    let state = InstallState::detect(store);

    // Neither protocol can succeed on a corrupt or unreadable record
    let mut status = InstallStatus::empty();
    if console == ConsoleClass::Retail
        && boot1_version == Some(config.required_boot1_version)
        && state == InstallState::Absent
    {
        status |= InstallStatus::INSTALL_POSSIBLE;
    }
    if state == InstallState::Installed {
        status |= InstallStatus::REMOVAL_POSSIBLE;
    }

    log::info!("Console Type:  {:?}", console);
    match boot1_version {
        Some(v) => log::info!("boot1 version: {}", v),
        None => log::warn!("boot1 version: unknown"),
    }
    match state {
        InstallState::Absent | InstallState::Installed => {
            log::info!("isfshax:       {}", state.describe())
        }
        InstallState::Corrupt | InstallState::Unreadable => {
            log::warn!("isfshax:       {}", state.describe())
        }
    }

    CompatibilityReport {
        console,
        boot1_version,
        state,
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::tests::MemFiles;
    use crate::install::install;
    use crate::uninstall::uninstall;
    use isfshax_core::store::MemStore;
    use isfshax_core::{Geometry, IsfshaxInfo, StoreError, Superblock, GEN_FIRST};

    struct FixedBoot1(Option<u16>);

    impl Boot1Source for FixedBoot1 {
        fn boot1_version(&mut self) -> Option<u16> {
            self.0
        }
    }

    const RETAIL: HardwareIds = HardwareIds {
        board_type: 0x4346,
        console_type: 0,
        asic_revision: 0,
    };

    #[test]
    fn test_retail_detection() {
        let dev = HardwareIds {
            board_type: 0x1234,
            console_type: 2,
            asic_revision: 0x0001_0021,
        };
        assert_eq!(ConsoleClass::classify(&dev), ConsoleClass::Unsupported);
        assert_eq!(ConsoleClass::classify(&RETAIL), ConsoleClass::Retail);
        for hw in [
            HardwareIds { console_type: 1, ..dev },
            HardwareIds { asic_revision: 0xCAFE_0000, ..dev },
            HardwareIds { asic_revision: 0x30, ..dev },
        ] {
            assert_eq!(ConsoleClass::classify(&hw), ConsoleClass::Retail);
        }
    }

    #[test]
    fn test_fresh_retail_console_can_install() {
        let mut store = MemStore::new(Geometry::SLC);
        let report = check(
            &mut store,
            &RETAIL,
            &mut FixedBoot1(Some(8377)),
            &InstallerConfig::default(),
        );
        assert!(report.status.can_install());
        assert!(!report.status.can_remove());
        assert_eq!(report.state, InstallState::Absent);
        assert_eq!(store.stats().flash_writes(), 0);
    }

    #[test]
    fn test_wrong_boot1_blocks_install() {
        let mut store = MemStore::new(Geometry::SLC);
        for version in [None, Some(8296)] {
            let report = check(
                &mut store,
                &RETAIL,
                &mut FixedBoot1(version),
                &InstallerConfig::default(),
            );
            assert_eq!(report.status, InstallStatus::empty());
        }
    }

    #[test]
    fn test_installed_allows_removal_only() {
        let mut store = MemStore::new(Geometry::SLC);
        let mut files = MemFiles::with_image(1);
        install(&mut store, &mut files, &InstallerConfig::default()).unwrap();
        let writes = store.stats().flash_writes();

        let report = check(
            &mut store,
            &RETAIL,
            &mut FixedBoot1(Some(8377)),
            &InstallerConfig::default(),
        );
        assert!(report.installed());
        assert_eq!(report.status, InstallStatus::REMOVAL_POSSIBLE);
        assert_eq!(store.stats().flash_writes(), writes);
    }

    fn seed_reserved_copy(store: &mut MemStore, info: &IsfshaxInfo) {
        let mut copy = Superblock::new();
        copy.set_generation(GEN_FIRST);
        copy.set_isfshax_info(info);
        store.seed_slot(50, copy);
    }

    #[test]
    fn test_corrupt_record_offers_nothing() {
        // Correct magic, duplicate slots
        let mut store = MemStore::new(Geometry::SLC);
        let mut info = IsfshaxInfo::new();
        info.slots[1].slot = info.slots[0].slot;
        seed_reserved_copy(&mut store, &info);

        let report = check(
            &mut store,
            &RETAIL,
            &mut FixedBoot1(Some(8377)),
            &InstallerConfig::default(),
        );
        assert_eq!(report.state, InstallState::Corrupt);
        assert!(!report.installed());
        assert_eq!(report.status, InstallStatus::empty());
        assert!(matches!(uninstall(&mut store), Err(IsfshaxError::CorruptRecord(_))));
    }

    #[test]
    fn test_wrong_magic_copy_is_not_absent() {
        let mut store = MemStore::new(Geometry::SLC);
        let mut info = IsfshaxInfo::new();
        info.magic = 0;
        seed_reserved_copy(&mut store, &info);

        let report = check(
            &mut store,
            &RETAIL,
            &mut FixedBoot1(Some(8377)),
            &InstallerConfig::default(),
        );
        assert_eq!(report.state, InstallState::Corrupt);
        assert!(!report.status.can_install());
    }

    #[test]
    fn test_unreadable_range_offers_nothing() {
        let mut store = MemStore::new(Geometry::SLC);
        store.fail_reserved_reads_with(StoreError::Ecc { block: 7 });
        let report = check(
            &mut store,
            &RETAIL,
            &mut FixedBoot1(Some(8377)),
            &InstallerConfig::default(),
        );
        assert_eq!(report.state, InstallState::Unreadable);
        assert_eq!(report.status, InstallStatus::empty());
    }
}
