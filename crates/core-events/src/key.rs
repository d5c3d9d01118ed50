//! Logical key identifiers and modifier state.
//!
//! Key identifiers are shared by the key-binding rules and by plugin key
//! callbacks, so both sides parse the same textual names (`"D"`, `"F3"`,
//! `"Enter"`) into one `KeyCode` and compare by value.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyParseError {
    #[error("empty key identifier")]
    Empty,
    #[error("unknown key identifier `{0}`")]
    Unknown(String),
    #[error("unknown modifier `{0}`")]
    UnknownModifier(String),
}

/// Physical-key identity. Letters are stored uppercase: `Char('d')` never
/// appears when built through [`KeyCode::char`] or `FromStr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Char(char),
    F(u8),
    Enter,
    Esc,
    Backspace,
    Tab,
    Space,
    Delete,
    Insert,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
}

impl KeyCode {
    /// Key for a printable character (letters folded to uppercase).
    pub fn char(c: char) -> Self {
        if c == ' ' {
            return KeyCode::Space;
        }
        KeyCode::Char(c.to_ascii_uppercase())
    }
}

impl FromStr for KeyCode {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(KeyParseError::Empty);
        }
        let mut chars = raw.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Ok(KeyCode::char(c));
        }
        let upper = raw.to_ascii_uppercase();
        let code = match upper.as_str() {
            "ENTER" | "RETURN" => KeyCode::Enter,
            "ESC" | "ESCAPE" => KeyCode::Esc,
            "BACKSPACE" | "BACK_SPACE" => KeyCode::Backspace,
            "TAB" => KeyCode::Tab,
            "SPACE" => KeyCode::Space,
            "DELETE" | "DEL" => KeyCode::Delete,
            "INSERT" => KeyCode::Insert,
            "UP" => KeyCode::Up,
            "DOWN" => KeyCode::Down,
            "LEFT" => KeyCode::Left,
            "RIGHT" => KeyCode::Right,
            "HOME" => KeyCode::Home,
            "END" => KeyCode::End,
            "PAGEUP" | "PAGE_UP" => KeyCode::PageUp,
            "PAGEDOWN" | "PAGE_DOWN" => KeyCode::PageDown,
            other => {
                if let Some(d) = other.strip_prefix("DIGIT")
                    && let [digit] = d.as_bytes()
                    && digit.is_ascii_digit()
                {
                    return Ok(KeyCode::Char(*digit as char));
                }
                match other.strip_prefix('F').map(str::parse::<u8>) {
                    Some(Ok(n)) if (1..=24).contains(&n) => KeyCode::F(n),
                    _ => return Err(KeyParseError::Unknown(raw.to_string())),
                }
            }
        };
        Ok(code)
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyCode::Char(c) => write!(f, "{c}"),
            KeyCode::F(n) => write!(f, "F{n}"),
            KeyCode::Enter => f.write_str("Enter"),
            KeyCode::Esc => f.write_str("Esc"),
            KeyCode::Backspace => f.write_str("Backspace"),
            KeyCode::Tab => f.write_str("Tab"),
            KeyCode::Space => f.write_str("Space"),
            KeyCode::Delete => f.write_str("Delete"),
            KeyCode::Insert => f.write_str("Insert"),
            KeyCode::Up => f.write_str("Up"),
            KeyCode::Down => f.write_str("Down"),
            KeyCode::Left => f.write_str("Left"),
            KeyCode::Right => f.write_str("Right"),
            KeyCode::Home => f.write_str("Home"),
            KeyCode::End => f.write_str("End"),
            KeyCode::PageUp => f.write_str("PageUp"),
            KeyCode::PageDown => f.write_str("PageDown"),
        }
    }
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct KeyModifiers: u8 {
        const CTRL = 0b0000_0001;
        const ALT  = 0b0000_0010;
        const SHIFT= 0b0000_0100;
    }
}

impl KeyModifiers {
    pub fn from_held(alt: bool, ctrl: bool, shift: bool) -> Self {
        let mut mods = KeyModifiers::empty();
        mods.set(KeyModifiers::ALT, alt);
        mods.set(KeyModifiers::CTRL, ctrl);
        mods.set(KeyModifiers::SHIFT, shift);
        mods
    }
}

/// One raw key press: key identity plus the modifiers held at that moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub mods: KeyModifiers,
}

impl KeyEvent {
    pub fn new(code: KeyCode, mods: KeyModifiers) -> Self {
        Self { code, mods }
    }

    pub fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::empty())
    }
}

/// Parses chords such as `ctrl+shift+D` or `F3`. A trailing `+` is the plus key.
impl FromStr for KeyEvent {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(KeyParseError::Empty);
        }
        let (prefix, key) = match raw.strip_suffix("++") {
            Some(p) => (p, "+"),
            None if raw == "+" => ("", "+"),
            None => match raw.rsplit_once('+') {
                Some((p, k)) => (p, k),
                None => ("", raw),
            },
        };
        let mut mods = KeyModifiers::empty();
        for part in prefix.split('+').filter(|p| !p.is_empty()) {
            match part.trim().to_ascii_lowercase().as_str() {
                "ctrl" | "control" | "c" => mods |= KeyModifiers::CTRL,
                "alt" | "a" | "m" => mods |= KeyModifiers::ALT,
                "shift" | "s" => mods |= KeyModifiers::SHIFT,
                _ => return Err(KeyParseError::UnknownModifier(part.to_string())),
            }
        }
        Ok(KeyEvent::new(key.parse()?, mods))
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mods.contains(KeyModifiers::CTRL) {
            f.write_str("ctrl+")?;
        }
        if self.mods.contains(KeyModifiers::ALT) {
            f.write_str("alt+")?;
        }
        if self.mods.contains(KeyModifiers::SHIFT) {
            f.write_str("shift+")?;
        }
        write!(f, "{}", self.code)
    }
}
