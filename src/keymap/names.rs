//! Enumeración estándar de identificadores de tecla del host.
//!
//! Es la numeración que usan los toolkits de escritorio en Linux (la misma que
//! `Qt::Key`): las teclas imprimibles valen su código ASCII en mayúsculas
//! (`Key_A` = `0x41`) y las teclas de función/control viven a partir de `0x0100_0000`.
//!
//! El formato del keymap acepta estos nombres en `platformKeyId`/`qtKey`:
//!
//! ```rust
//! use orbit_input_capture::KeyNames;
//! use orbit_input_capture::keymap::names::{KEY_ESCAPE, StandardKeyNames};
//!
//! assert_eq!(StandardKeyNames.key_from_name("Key_A"), Some(0x41));
//! assert_eq!(StandardKeyNames.key_from_name("Key_F12"), Some(0x0100_003B));
//! assert_eq!(StandardKeyNames.key_from_name("Key_Escape"), Some(KEY_ESCAPE));
//! ```

use std::borrow::Cow;

use crate::traits::keys::KeyNames;

pub const KEY_ESCAPE: u32 = 0x0100_0000;
pub const KEY_TAB: u32 = 0x0100_0001;
pub const KEY_BACKSPACE: u32 = 0x0100_0003;
pub const KEY_RETURN: u32 = 0x0100_0004;
pub const KEY_ENTER: u32 = 0x0100_0005;
pub const KEY_F1: u32 = 0x0100_0030;
pub const KEY_F35: u32 = 0x0100_0052;

const FUNCTION_KEY_COUNT: u32 = KEY_F35 - KEY_F1 + 1;

/// Teclas con nombre propio. Letras, dígitos y `Key_F1`..`Key_F35` se resuelven por patrón.
const NAMED_KEYS: &[(&str, u32)] = &[
    ("Key_Escape", KEY_ESCAPE),
    ("Key_Tab", KEY_TAB),
    ("Key_Backtab", 0x0100_0002),
    ("Key_Backspace", KEY_BACKSPACE),
    ("Key_Return", KEY_RETURN),
    ("Key_Enter", KEY_ENTER),
    ("Key_Insert", 0x0100_0006),
    ("Key_Delete", 0x0100_0007),
    ("Key_Pause", 0x0100_0008),
    ("Key_Print", 0x0100_0009),
    ("Key_SysReq", 0x0100_000A),
    ("Key_Clear", 0x0100_000B),
    ("Key_Home", 0x0100_0010),
    ("Key_End", 0x0100_0011),
    ("Key_Left", 0x0100_0012),
    ("Key_Up", 0x0100_0013),
    ("Key_Right", 0x0100_0014),
    ("Key_Down", 0x0100_0015),
    ("Key_PageUp", 0x0100_0016),
    ("Key_PageDown", 0x0100_0017),
    ("Key_Shift", 0x0100_0020),
    ("Key_Control", 0x0100_0021),
    ("Key_Meta", 0x0100_0022),
    ("Key_Alt", 0x0100_0023),
    ("Key_CapsLock", 0x0100_0024),
    ("Key_NumLock", 0x0100_0025),
    ("Key_ScrollLock", 0x0100_0026),
    ("Key_Super_L", 0x0100_0053),
    ("Key_Super_R", 0x0100_0054),
    ("Key_Menu", 0x0100_0055),
    ("Key_AltGr", 0x0100_1103),
    ("Key_Space", 0x20),
    ("Key_Exclam", 0x21),
    ("Key_QuoteDbl", 0x22),
    ("Key_NumberSign", 0x23),
    ("Key_Dollar", 0x24),
    ("Key_Percent", 0x25),
    ("Key_Ampersand", 0x26),
    ("Key_Apostrophe", 0x27),
    ("Key_ParenLeft", 0x28),
    ("Key_ParenRight", 0x29),
    ("Key_Asterisk", 0x2A),
    ("Key_Plus", 0x2B),
    ("Key_Comma", 0x2C),
    ("Key_Minus", 0x2D),
    ("Key_Period", 0x2E),
    ("Key_Slash", 0x2F),
    ("Key_Colon", 0x3A),
    ("Key_Semicolon", 0x3B),
    ("Key_Less", 0x3C),
    ("Key_Equal", 0x3D),
    ("Key_Greater", 0x3E),
    ("Key_Question", 0x3F),
    ("Key_At", 0x40),
    ("Key_BracketLeft", 0x5B),
    ("Key_Backslash", 0x5C),
    ("Key_BracketRight", 0x5D),
    ("Key_AsciiCircum", 0x5E),
    ("Key_Underscore", 0x5F),
    ("Key_QuoteLeft", 0x60),
    ("Key_BraceLeft", 0x7B),
    ("Key_Bar", 0x7C),
    ("Key_BraceRight", 0x7D),
    ("Key_AsciiTilde", 0x7E),
];

/// Resolución de nombres sobre la numeración estándar del host.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardKeyNames;

impl KeyNames for StandardKeyNames {
    fn key_from_name(&self, name: &str) -> Option<u32> {
        if let Some(&(_, key)) = NAMED_KEYS.iter().find(|(candidate, _)| *candidate == name) {
            return Some(key);
        }
        let suffix = name.strip_prefix("Key_")?;
        let mut chars = suffix.chars();
        if let (Some(ch), None) = (chars.next(), chars.next()) {
            if ch.is_ascii_uppercase() || ch.is_ascii_digit() {
                return Some(u32::from(ch));
            }
            return None;
        }
        let number: u32 = suffix.strip_prefix('F')?.parse().ok()?;
        if (1..=FUNCTION_KEY_COUNT).contains(&number) && !suffix[1..].starts_with('0') {
            return Some(KEY_F1 + number - 1);
        }
        None
    }

    fn name_of_key(&self, key: u32) -> Option<Cow<'static, str>> {
        if let Some(&(name, _)) = NAMED_KEYS.iter().find(|(_, candidate)| *candidate == key) {
            return Some(Cow::Borrowed(name));
        }
        if let Some(ch) = char::from_u32(key).filter(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit()) {
            return Some(Cow::Owned(format!("Key_{ch}")));
        }
        if (KEY_F1..=KEY_F35).contains(&key) {
            return Some(Cow::Owned(format!("Key_F{}", key - KEY_F1 + 1)));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_letters_digits_and_function_keys() {
        let names = StandardKeyNames;
        assert_eq!(names.key_from_name("Key_A"), Some(0x41));
        assert_eq!(names.key_from_name("Key_Z"), Some(0x5A));
        assert_eq!(names.key_from_name("Key_7"), Some(0x37));
        assert_eq!(names.key_from_name("Key_F1"), Some(KEY_F1));
        assert_eq!(names.key_from_name("Key_F35"), Some(KEY_F35));
    }

    #[test]
    fn rejects_unknown_names() {
        let names = StandardKeyNames;
        assert_eq!(names.key_from_name("Key_a"), None);
        assert_eq!(names.key_from_name("Key_F0"), None);
        assert_eq!(names.key_from_name("Key_F01"), None);
        assert_eq!(names.key_from_name("Key_F36"), None);
        assert_eq!(names.key_from_name("Escape"), None);
        assert_eq!(names.key_from_name("Key_"), None);
    }

    #[test]
    fn names_round_trip() {
        let names = StandardKeyNames;
        for name in ["Key_Escape", "Key_Q", "Key_0", "Key_F10", "Key_BracketLeft"] {
            let key = names.key_from_name(name).unwrap();
            assert_eq!(names.name_of_key(key).as_deref(), Some(name));
        }
        assert_eq!(names.name_of_key(0x0200_0000), None);
    }
}
