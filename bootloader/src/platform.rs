// Board-side collaborators the installer shell runs against

use core::fmt::Write;

use isfshax_core::boot1::Boot1Source;
use isfshax_core::SuperblockStore;
use isfshax_installer::{HardwareInfo, ImageSource};

/// Front panel buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// POWER: move to the next entry
    Next,
    /// EJECT: activate the selected entry
    Select,
}

pub trait Buttons {
    /// Block until a button is pressed.
    fn wait_press(&mut self) -> Button;
}

/// Everything the shell needs from the board, borrowed at once.
pub struct Parts<'a, P: Platform + ?Sized> {
    pub store: &'a mut P::Store,
    pub files: &'a mut P::Files,
    pub hardware: &'a P::Hardware,
    pub boot1: &'a mut P::Boot1,
    pub console: &'a mut P::Console,
    pub buttons: &'a mut P::Buttons,
}

pub trait Platform {
    /// SLC superblock ring
    type Store: SuperblockStore;
    /// SD card
    type Files: ImageSource;
    type Hardware: HardwareInfo;
    type Boot1: Boot1Source;
    type Console: Write;
    type Buttons: Buttons;

    fn parts(&mut self) -> Parts<'_, Self>;
}
