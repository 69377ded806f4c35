//! Type-safe key bindings used by the scrolling components.
//!
//! A [`Binding`] groups one or more key presses under a single action and
//! carries the help text shown to the user. Components expose their bindings
//! through the [`KeyMap`] trait so help views can list them.

use bubbletea_rs::KeyMsg;
use crossterm::event::{KeyCode, KeyModifiers};

/// A single key press: a key code plus the modifiers held with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    /// The key that was pressed.
    pub code: KeyCode,
    /// Modifiers that must be held.
    pub modifiers: KeyModifiers,
}

impl From<KeyCode> for KeyPress {
    fn from(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::NONE,
        }
    }
}

impl From<(KeyCode, KeyModifiers)> for KeyPress {
    fn from((code, modifiers): (KeyCode, KeyModifiers)) -> Self {
        Self { code, modifiers }
    }
}

impl From<&str> for KeyPress {
    /// Parses names such as `"pgdown"`, `"home"`, `"j"` or `"ctrl+d"`.
    ///
    /// Unknown names fall back to [`KeyCode::Null`], which never matches.
    fn from(name: &str) -> Self {
        let (modifiers, key) = match name.strip_prefix("ctrl+") {
            Some(rest) => (KeyModifiers::CONTROL, rest),
            None => match name.strip_prefix("alt+") {
                Some(rest) => (KeyModifiers::ALT, rest),
                None => (KeyModifiers::NONE, name),
            },
        };

        let code = match key {
            "up" => KeyCode::Up,
            "down" => KeyCode::Down,
            "left" => KeyCode::Left,
            "right" => KeyCode::Right,
            "pgup" => KeyCode::PageUp,
            "pgdown" => KeyCode::PageDown,
            "home" => KeyCode::Home,
            "end" => KeyCode::End,
            "enter" => KeyCode::Enter,
            "esc" => KeyCode::Esc,
            "tab" => KeyCode::Tab,
            "space" | " " => KeyCode::Char(' '),
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => KeyCode::Char(c),
                    _ => KeyCode::Null,
                }
            }
        };

        Self { code, modifiers }
    }
}

/// Help text for a binding: the key label and what it does.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Help {
    /// Short label for the keys, e.g. `"↓/j"`.
    pub key: String,
    /// Description of the action, e.g. `"down"`.
    pub desc: String,
}

/// A set of key presses bound to one action.
///
/// # Examples
///
/// ```rust
/// use bubbletea_dllist::key::Binding;
/// use crossterm::event::KeyCode;
///
/// let down = Binding::new(vec![KeyCode::Down, KeyCode::Char('j')]).with_help("↓/j", "down");
/// assert_eq!(down.keys().len(), 2);
/// assert_eq!(down.help().desc, "down");
/// ```
#[derive(Debug, Clone)]
pub struct Binding {
    keys: Vec<KeyPress>,
    help: Help,
    enabled: bool,
}

impl Binding {
    /// Creates an enabled binding for the given keys.
    pub fn new<K: Into<KeyPress>>(keys: Vec<K>) -> Self {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            help: Help::default(),
            enabled: true,
        }
    }

    /// Sets the help label and description.
    pub fn with_help(mut self, key: impl Into<String>, desc: impl Into<String>) -> Self {
        self.help = Help {
            key: key.into(),
            desc: desc.into(),
        };
        self
    }

    /// Returns the bound key presses.
    pub fn keys(&self) -> &[KeyPress] {
        &self.keys
    }

    /// Returns the help text.
    pub fn help(&self) -> &Help {
        &self.help
    }

    /// Whether the binding currently responds to input.
    pub fn enabled(&self) -> bool {
        self.enabled && !self.keys.is_empty()
    }

    /// Enables or disables the binding.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Reports whether `msg` triggers this binding.
    ///
    /// Shift is ignored so that uppercase characters reported with a shift
    /// modifier still match their character binding.
    pub fn matches(&self, msg: &KeyMsg) -> bool {
        if !self.enabled() {
            return false;
        }
        let held = msg.modifiers.difference(KeyModifiers::SHIFT);
        self.keys
            .iter()
            .any(|k| k.code == msg.key && k.modifiers.difference(KeyModifiers::SHIFT) == held)
    }
}

/// Components that publish their key bindings for help views.
pub trait KeyMap {
    /// Bindings for the compact, single-line help.
    fn short_help(&self) -> Vec<&Binding>;
    /// Bindings grouped into columns for the expanded help.
    fn full_help(&self) -> Vec<Vec<&Binding>>;
}
