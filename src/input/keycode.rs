//! Mapping between `rdev` keys and integer virtual key codes
//!
//! Codes follow the Windows virtual-key numbering, which is what the timeline
//! format stores in `code`. On Windows, keys rdev reports as `Unknown(code)`
//! already carry a virtual-key code and keep it in both directions. Elsewhere
//! that code is a platform scan or key code and is not recordable.

use rdev::Key;

const VIRTUAL_KEYS: &[(Key, u32)] = &[
    (Key::Backspace, 0x08),
    (Key::Tab, 0x09),
    (Key::Return, 0x0D),
    (Key::Pause, 0x13),
    (Key::CapsLock, 0x14),
    (Key::Escape, 0x1B),
    (Key::Space, 0x20),
    (Key::PageUp, 0x21),
    (Key::PageDown, 0x22),
    (Key::End, 0x23),
    (Key::Home, 0x24),
    (Key::LeftArrow, 0x25),
    (Key::UpArrow, 0x26),
    (Key::RightArrow, 0x27),
    (Key::DownArrow, 0x28),
    (Key::PrintScreen, 0x2C),
    (Key::Insert, 0x2D),
    (Key::Delete, 0x2E),
    (Key::Num0, 0x30),
    (Key::Num1, 0x31),
    (Key::Num2, 0x32),
    (Key::Num3, 0x33),
    (Key::Num4, 0x34),
    (Key::Num5, 0x35),
    (Key::Num6, 0x36),
    (Key::Num7, 0x37),
    (Key::Num8, 0x38),
    (Key::Num9, 0x39),
    (Key::KeyA, 0x41),
    (Key::KeyB, 0x42),
    (Key::KeyC, 0x43),
    (Key::KeyD, 0x44),
    (Key::KeyE, 0x45),
    (Key::KeyF, 0x46),
    (Key::KeyG, 0x47),
    (Key::KeyH, 0x48),
    (Key::KeyI, 0x49),
    (Key::KeyJ, 0x4A),
    (Key::KeyK, 0x4B),
    (Key::KeyL, 0x4C),
    (Key::KeyM, 0x4D),
    (Key::KeyN, 0x4E),
    (Key::KeyO, 0x4F),
    (Key::KeyP, 0x50),
    (Key::KeyQ, 0x51),
    (Key::KeyR, 0x52),
    (Key::KeyS, 0x53),
    (Key::KeyT, 0x54),
    (Key::KeyU, 0x55),
    (Key::KeyV, 0x56),
    (Key::KeyW, 0x57),
    (Key::KeyX, 0x58),
    (Key::KeyY, 0x59),
    (Key::KeyZ, 0x5A),
    (Key::MetaLeft, 0x5B),
    (Key::MetaRight, 0x5C),
    (Key::Kp0, 0x60),
    (Key::Kp1, 0x61),
    (Key::Kp2, 0x62),
    (Key::Kp3, 0x63),
    (Key::Kp4, 0x64),
    (Key::Kp5, 0x65),
    (Key::Kp6, 0x66),
    (Key::Kp7, 0x67),
    (Key::Kp8, 0x68),
    (Key::Kp9, 0x69),
    (Key::KpMultiply, 0x6A),
    (Key::KpPlus, 0x6B),
    (Key::KpMinus, 0x6D),
    (Key::KpDelete, 0x6E),
    (Key::KpDivide, 0x6F),
    (Key::F1, 0x70),
    (Key::F2, 0x71),
    (Key::F3, 0x72),
    (Key::F4, 0x73),
    (Key::F5, 0x74),
    (Key::F6, 0x75),
    (Key::F7, 0x76),
    (Key::F8, 0x77),
    (Key::F9, 0x78),
    (Key::F10, 0x79),
    (Key::F11, 0x7A),
    (Key::F12, 0x7B),
    (Key::NumLock, 0x90),
    (Key::ScrollLock, 0x91),
    (Key::ShiftLeft, 0xA0),
    (Key::ShiftRight, 0xA1),
    (Key::ControlLeft, 0xA2),
    (Key::ControlRight, 0xA3),
    (Key::Alt, 0xA4),
    (Key::AltGr, 0xA5),
    (Key::SemiColon, 0xBA),
    (Key::Equal, 0xBB),
    (Key::Comma, 0xBC),
    (Key::Minus, 0xBD),
    (Key::Dot, 0xBE),
    (Key::Slash, 0xBF),
    (Key::BackQuote, 0xC0),
    (Key::LeftBracket, 0xDB),
    (Key::BackSlash, 0xDC),
    (Key::RightBracket, 0xDD),
    (Key::Quote, 0xDE),
    (Key::IntlBackslash, 0xE2),
];

/// Virtual key code for `key`, if it has one.
///
/// `KpReturn` shares `Return`'s code; `Function` has none and is not recordable.
pub fn virtual_code(key: Key) -> Option<u32> {
    match key {
        Key::Unknown(code) => unknown_virtual_code(code),
        Key::KpReturn => Some(0x0D),
        Key::Function => None,
        key => VIRTUAL_KEYS
            .iter()
            .find(|(known, _)| *known == key)
            .map(|(_, code)| *code),
    }
}

#[cfg(target_os = "windows")]
fn unknown_virtual_code(code: u32) -> Option<u32> {
    Some(code)
}

// X11 keycodes and macOS key codes overlap the virtual-key range
#[cfg(not(target_os = "windows"))]
fn unknown_virtual_code(_code: u32) -> Option<u32> {
    None
}

/// Key to synthesize for a stored virtual key code
pub fn key_from_code(code: u32) -> Key {
    VIRTUAL_KEYS
        .iter()
        .find(|(_, known)| *known == code)
        .map(|(key, _)| *key)
        .unwrap_or(Key::Unknown(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_keys() {
        assert_eq!(virtual_code(Key::KeyA), Some(65));
        assert_eq!(virtual_code(Key::Return), Some(13));
        assert_eq!(virtual_code(Key::ShiftLeft), Some(0xA0));
        assert_eq!(key_from_code(0x1B), Key::Escape);
        assert_eq!(key_from_code(0x7B), Key::F12);
    }

    #[test]
    fn test_every_table_entry_maps_back() {
        for (key, code) in VIRTUAL_KEYS {
            assert_eq!(virtual_code(*key), Some(*code), "{:?}", key);
            assert_eq!(key_from_code(*code), *key, "{:#x}", code);
        }
    }

    #[test]
    fn test_codes_are_unique() {
        let mut codes: Vec<u32> = VIRTUAL_KEYS.iter().map(|(_, code)| *code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), VIRTUAL_KEYS.len());
    }

    #[test]
    fn test_unmapped_codes_replay_as_unknown() {
        assert_eq!(key_from_code(0xFE), Key::Unknown(0xFE));
    }

    #[cfg(target_os = "windows")]
    #[test]
    fn test_unknown_keys_keep_their_virtual_code() {
        assert_eq!(virtual_code(Key::Unknown(0xFE)), Some(0xFE));
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn test_unknown_platform_codes_are_not_recorded() {
        // X11 keycode 121 (mute) must not become VK 0x79 (F10)
        assert_eq!(virtual_code(Key::Unknown(121)), None);
        assert_eq!(virtual_code(Key::Unknown(0x48)), None);
        assert_eq!(virtual_code(Key::F10), Some(0x79));
    }

    #[test]
    fn test_keypad_return_and_function() {
        assert_eq!(virtual_code(Key::KpReturn), Some(0x0D));
        assert_eq!(key_from_code(0x0D), Key::Return);
        assert_eq!(virtual_code(Key::Function), None);
    }
}
