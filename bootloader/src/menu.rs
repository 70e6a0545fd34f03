// Two-button text menu

use alloc::vec::Vec;
use core::fmt::Write;

use crate::platform::{Button, Buttons};

pub struct MenuItem<A> {
    pub label: &'static str,
    /// `None` for spacer lines.
    pub action: Option<A>,
    pub active: bool,
}

impl<A> MenuItem<A> {
    pub fn new(label: &'static str, action: A, active: bool) -> Self {
        Self {
            label,
            action: Some(action),
            active,
        }
    }

    pub fn spacer() -> Self {
        Self {
            label: "",
            action: None,
            active: false,
        }
    }
}

pub struct Menu<A> {
    pub title: Option<&'static str>,
    items: Vec<MenuItem<A>>,
    selected: usize,
}

impl<A: Copy> Menu<A> {
    /// Menu with the cursor on the first active entry.
    pub fn new(title: Option<&'static str>, items: Vec<MenuItem<A>>) -> Self {
        let selected = items.iter().position(|i| i.active).unwrap_or(0);
        Self {
            title,
            items,
            selected,
        }
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn select(&mut self, index: usize) {
        if index < self.items.len() {
            self.selected = index;
        }
    }

    pub fn set_active(&mut self, index: usize, active: bool) {
        if let Some(item) = self.items.get_mut(index) {
            item.active = active && item.action.is_some();
        }
    }

    pub fn is_active(&self, index: usize) -> bool {
        self.items.get(index).map(|i| i.active).unwrap_or(false)
    }

    /// Move to the next active entry, wrapping around.
    ///
    /// Stays put if no other entry is active.
    pub fn next_selection(&mut self) {
        let count = self.items.len();
        let mut j = self.selected;
        for _ in 1..count {
            j = (j + 1) % count;
            if self.items[j].active {
                break;
            }
        }
        self.selected = j;
    }

    pub fn render<W: Write + ?Sized>(&self, out: &mut W) -> core::fmt::Result {
        if let Some(title) = self.title {
            writeln!(out, "{}", title)?;
            writeln!(out)?;
        }
        for (i, item) in self.items.iter().enumerate() {
            if !item.active {
                writeln!(out)?;
            } else if i == self.selected {
                writeln!(out, "> {}", item.label)?;
            } else {
                writeln!(out, "  {}", item.label)?;
            }
        }
        Ok(())
    }

    /// Draw and handle buttons until an active entry is chosen.
    pub fn choose<W, B>(&mut self, out: &mut W, buttons: &mut B) -> A
    where
        W: Write + ?Sized,
        B: Buttons + ?Sized,
    {
        loop {
            let _ = self.render(out);
            match buttons.wait_press() {
                Button::Next => self.next_selection(),
                Button::Select => {
                    if let Some(MenuItem {
                        active: true,
                        action: Some(action),
                        ..
                    }) = self.items.get(self.selected)
                    {
                        return *action;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::collections::VecDeque;
    use alloc::string::String;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Pick {
        A,
        B,
        C,
    }

    struct Script(VecDeque<Button>);

    impl Buttons for Script {
        fn wait_press(&mut self) -> Button {
            self.0.pop_front().expect("script exhausted")
        }
    }

    fn menu(b_active: bool) -> Menu<Pick> {
        Menu::new(
            Some("Test"),
            vec![
                MenuItem::new("a", Pick::A, true),
                MenuItem::new("b", Pick::B, b_active),
                MenuItem::spacer(),
                MenuItem::new("c", Pick::C, true),
            ],
        )
    }

    #[test]
    fn test_next_selection_skips_inactive_and_wraps() {
        let mut m = menu(false);
        assert_eq!(m.selected(), 0);
        m.next_selection();
        assert_eq!(m.selected(), 3);
        m.next_selection();
        assert_eq!(m.selected(), 0);
    }

    #[test]
    fn test_first_active_entry_selected() {
        let m = Menu::new(
            None,
            vec![MenuItem::spacer(), MenuItem::new("x", Pick::A, true)],
        );
        assert_eq!(m.selected(), 1);
    }

    #[test]
    fn test_single_active_entry_stays() {
        let mut m = Menu::new(None, vec![MenuItem::new("only", Pick::A, true)]);
        m.next_selection();
        assert_eq!(m.selected(), 0);
    }

    #[test]
    fn test_spacer_cannot_be_activated() {
        let mut m = menu(true);
        m.set_active(2, true);
        assert!(!m.is_active(2));
        m.set_active(1, false);
        assert!(!m.is_active(1));
    }

    #[test]
    fn test_choose_follows_buttons() {
        let mut m = menu(true);
        let mut out = String::new();
        let mut buttons = Script(VecDeque::from(vec![Button::Next, Button::Next, Button::Select]));
        assert_eq!(m.choose(&mut out, &mut buttons), Pick::C);
        assert!(out.contains("> c"));
        assert!(out.contains("Test"));
    }

    #[test]
    #[should_panic(expected = "script exhausted")]
    fn test_empty_menu_ignores_select() {
        let mut m: Menu<Pick> = Menu::new(None, Vec::new());
        let mut out = String::new();
        let mut buttons = Script(VecDeque::from(vec![Button::Select, Button::Next, Button::Select]));
        m.choose(&mut out, &mut buttons);
    }
}
