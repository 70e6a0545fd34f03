//! isfshax installer shell
//!
//! disclaimer -> compatibility check -> main menu. Install and Uninstall
//! are only offered when the compatibility check allows them, and both ask
//! for confirmation with "No" preselected.

use alloc::vec;
use core::fmt::Write;

use isfshax_core::{logger, REDUNDANCY};
use isfshax_installer::{compat, install, uninstall, InstallState, InstallerConfig};

use crate::menu::{Menu, MenuItem};
use crate::platform::{Buttons, Parts, Platform};

const DISCLAIMER: &str = "\
THIS SOFTWARE COMES WITH ABSOLUTELY NO WARRANTY! YOU ARE
CHOOSING TO INSTALL THIS SOFTWARE, AT YOUR OWN RISK.
THE AUTHOR(S) OF THIS SOFTWARE WILL NOT BE HELD LIABLE
FOR ANY DAMAGE IT MIGHT CAUSE.

THIS SOFTWARE IS AVAILABLE FOR FREE UNDER THE TERMS OF THE
GNU GPLv2 LICENSE. IF YOU'VE PAID FOR THIS SOFTWARE, YOU
HAVE BEEN SCAMMED AND SHOULD ASK FOR YOUR MONEY BACK.
";

const UNINSTALL_WARNING: &str = "\
WARNING: Before uninstalling isfshax make sure the console boots correctly
using the 'Patch ISFShax and boot IOS (slc)' option in minute.
If your console can't boot correctly, uninstalling isfshax will BRICK the console!!!
";

const CREDITS: &str = "\
Thanks to:

rw-r-r-0644, Maschell, QuarkTheAwesome, GaryOderNichts, exjam,
vgmoose, CompuCat, hexkyz, derrek, plutoo, naehrwert, hykem,
yellows8, smealum, Salt team, fail0verflow, ForTheUsers,
libwiiu team, and many others!
";

/// Main menu entry indices
const ENTRY_UNINSTALL: usize = 1;
const ENTRY_POWER_OFF: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MainAction {
    Install,
    Uninstall,
    PowerOff,
    Credits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Answer {
    Yes,
    No,
}

/// Why the shell returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    PowerOff,
}

fn wait_continue<W: Write + ?Sized, B: Buttons + ?Sized>(out: &mut W, buttons: &mut B) {
    let mut m = Menu::new(None, vec![MenuItem::new("Continue", (), true)]);
    m.choose(out, buttons);
}

/// Ask for confirmation; "No" is preselected.
fn ask_confirmation<W: Write + ?Sized, B: Buttons + ?Sized>(out: &mut W, buttons: &mut B) -> bool {
    let mut m = Menu::new(
        None,
        vec![
            MenuItem::new("Yes, proceed", Answer::Yes, true),
            MenuItem::new("No, go back", Answer::No, true),
        ],
    );
    m.select(1);
    m.choose(out, buttons) == Answer::Yes
}

/// Print log lines recorded since `mark`.
fn drain_logs<W: Write + ?Sized>(out: &mut W, mark: usize) {
    for line in logger::logs_since(mark) {
        let _ = writeln!(out, "{}", line.as_str());
    }
}

pub fn run<P: Platform + ?Sized>(platform: &mut P, config: &InstallerConfig) -> Exit {
    let Parts {
        store,
        files,
        hardware,
        boot1,
        console: out,
        buttons,
    } = platform.parts();

    let _ = writeln!(out, "isfshax installer");
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", DISCLAIMER);
    wait_continue(out, buttons);

    let _ = writeln!(out, "Compatibility check");
    let report = compat::check(store, hardware, boot1, config);
    let _ = writeln!(out, "Console Type:        {:?}", report.console);
    match report.boot1_version {
        Some(v) if v == config.required_boot1_version => {
            let _ = writeln!(out, "boot1 version:       {}", v);
        }
        Some(v) => {
            let _ = writeln!(out, "boot1 version:       Unsupported ({})", v);
        }
        None => {
            let _ = writeln!(out, "boot1 version:       Unsupported (unknown)");
        }
    }
    let state = match report.state {
        InstallState::Absent if report.status.can_install() => "Can be installed",
        InstallState::Absent => "Cannot be installed",
        other => other.describe(),
    };
    let _ = writeln!(out, "isfshax:             {}", state);
    wait_continue(out, buttons);

    let mut main = Menu::new(
        Some("Main menu"),
        vec![
            MenuItem::new("Install isfshax", MainAction::Install, report.status.can_install()),
            MenuItem::new("Uninstall isfshax", MainAction::Uninstall, report.status.can_remove()),
            MenuItem::spacer(),
            MenuItem::new("Power off", MainAction::PowerOff, true),
            MenuItem::spacer(),
            MenuItem::new("Credits", MainAction::Credits, true),
        ],
    );

    loop {
        match main.choose(out, buttons) {
            MainAction::Install => {
                let _ = writeln!(out, "Install isfshax now?");
                if !ask_confirmation(out, buttons) {
                    continue;
                }
                let _ = writeln!(out, "Installing isfshax...");
                let mark = logger::total_log_count();
                let result = install(store, files, config);
                drain_logs(out, mark);
                match result {
                    Ok(report) => {
                        let _ = writeln!(
                            out,
                            "SUCCESS. {}/{} copies written, {} good slots left.",
                            report.written, REDUNDANCY, report.remaining_good
                        );
                        main.set_active(ENTRY_UNINSTALL, true);
                        main.select(ENTRY_POWER_OFF);
                    }
                    Err(e) => {
                        let _ = writeln!(out, "ERROR: {}", e);
                    }
                }
                wait_continue(out, buttons);
            }
            MainAction::Uninstall => {
                let _ = writeln!(out, "{}", UNINSTALL_WARNING);
                let _ = writeln!(out, "Uninstall isfshax now?");
                if !ask_confirmation(out, buttons) {
                    continue;
                }
                let _ = writeln!(out, "Uninstalling isfshax...");
                let mark = logger::total_log_count();
                let result = uninstall(store);
                drain_logs(out, mark);
                match result {
                    Ok(_) => {
                        let _ = writeln!(out, "SUCCESS.");
                        main.set_active(ENTRY_UNINSTALL, false);
                        main.select(ENTRY_POWER_OFF);
                    }
                    Err(e) => {
                        let _ = writeln!(out, "ERROR: {}", e);
                    }
                }
                wait_continue(out, buttons);
            }
            MainAction::Credits => {
                let _ = writeln!(out, "{}", CREDITS);
                wait_continue(out, buttons);
            }
            MainAction::PowerOff => return Exit::PowerOff,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Button;
    use alloc::collections::{BTreeMap, VecDeque};
    use alloc::string::String;
    use isfshax_core::boot1::Boot1Source;
    use isfshax_core::layout::SUPER_SIZE;
    use isfshax_core::store::MemStore;
    use isfshax_core::{Geometry, IsfshaxInfo, Superblock, SuperblockStore, GEN_FIRST};
    use isfshax_installer::{HardwareIds, ImageSource};
    use sha1::{Digest, Sha1};

    struct Files(BTreeMap<&'static str, Vec<u8>>);

    impl ImageSource for Files {
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

    struct Boot1(Option<u16>);

    impl Boot1Source for Boot1 {
        fn boot1_version(&mut self) -> Option<u16> {
            self.0
        }
    }

    struct Script(VecDeque<Button>);

    impl Buttons for Script {
        fn wait_press(&mut self) -> Button {
            self.0.pop_front().expect("button script exhausted")
        }
    }

    struct TestBoard {
        store: MemStore,
        files: Files,
        hardware: HardwareIds,
        boot1: Boot1,
        console: String,
        buttons: Script,
    }

    impl Platform for TestBoard {
        type Store = MemStore;
        type Files = Files;
        type Hardware = HardwareIds;
        type Boot1 = Boot1;
        type Console = String;
        type Buttons = Script;

        fn parts(&mut self) -> Parts<'_, Self> {
            Parts {
                store: &mut self.store,
                files: &mut self.files,
                hardware: &self.hardware,
                boot1: &mut self.boot1,
                console: &mut self.console,
                buttons: &mut self.buttons,
            }
        }
    }

    fn board(buttons: &[Button]) -> TestBoard {
        let mut image = vec![0xEE; SUPER_SIZE];
        image[0..4].copy_from_slice(b"SFS!");
        let digest = Sha1::digest(&image).to_vec();
        let mut files = BTreeMap::new();
        files.insert("superblock.img", image);
        files.insert("superblock.img.sha", digest);
        TestBoard {
            store: MemStore::new(Geometry::SLC),
            files: Files(files),
            hardware: HardwareIds {
                board_type: 0x4346,
                console_type: 0,
                asic_revision: 0,
            },
            boot1: Boot1(Some(8377)),
            console: String::new(),
            buttons: Script(buttons.iter().copied().collect()),
        }
    }

    use Button::{Next as N, Select as S};

    #[test]
    fn test_power_off_from_main_menu() {
        // disclaimer, compat, then Install -> Power off
        let mut b = board(&[S, S, N, S]);
        assert_eq!(run(&mut b, &InstallerConfig::default()), Exit::PowerOff);
        assert!(b.console.contains("Can be installed"));
        assert_eq!(b.store.stats().flash_writes(), 0);
    }

    #[test]
    fn test_confirmation_defaults_to_no() {
        // Install, accept the preselected "No", power off
        let mut b = board(&[S, S, S, S, N, S]);
        assert_eq!(run(&mut b, &InstallerConfig::default()), Exit::PowerOff);
        assert_eq!(b.store.stats().flash_writes(), 0);
    }

    #[test]
    fn test_install_then_power_off_preselected() {
        // Install, move to "Yes", confirm, continue, power off is now selected
        let mut b = board(&[S, S, S, N, S, S, S]);
        assert_eq!(run(&mut b, &InstallerConfig::default()), Exit::PowerOff);
        assert!(b.console.contains("SUCCESS. 4/4 copies written"));
        assert!(b.store.load_super(GEN_FIRST, u32::MAX).is_ok());
    }

    #[test]
    fn test_uninstall_offered_after_install() {
        // Install; then Next from Power off wraps Credits -> Install -> Uninstall
        let mut b = board(&[S, S, S, N, S, S, N, N, N, S, N, S, S, S]);
        assert_eq!(run(&mut b, &InstallerConfig::default()), Exit::PowerOff);
        assert!(b.console.contains("BRICK"));
        assert!(b.store.load_super(GEN_FIRST, u32::MAX).is_err());
    }

    #[test]
    fn test_unsupported_console_only_offers_power_off_and_credits() {
        let mut b = board(&[S, S, N, S, S, N, S]);
        b.hardware = HardwareIds {
            board_type: 0,
            console_type: 0,
            asic_revision: 0x10,
        };
        // Power off is the first active entry: Credits, continue, back to Power off
        assert_eq!(run(&mut b, &InstallerConfig::default()), Exit::PowerOff);
        assert!(b.console.contains("Cannot be installed"));
        assert!(b.console.contains("Thanks to:"));
    }

    #[test]
    fn test_corrupt_record_offers_neither_action() {
        let mut b = board(&[S, S, S]);
        let mut copy = Superblock::new();
        copy.set_generation(GEN_FIRST);
        copy.set_isfshax_info(&IsfshaxInfo::new());
        b.store.seed_slot(40, copy);
        // Power off is the first active entry
        assert_eq!(run(&mut b, &InstallerConfig::default()), Exit::PowerOff);
        assert!(b.console.contains("Corrupt install record"));
        assert_eq!(b.store.stats().flash_writes(), 0);
    }
}
