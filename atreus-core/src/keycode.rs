//! Keycode encoding used by the layout tables.
//!
//! Every cell of a layout table is a single `u8` that multiplexes several
//! meanings into disjoint ranges:
//!
//! | raw          | meaning                                      |
//! |--------------|----------------------------------------------|
//! | `0`          | empty cell                                   |
//! | `1..=100`    | plain HID keycode                            |
//! | `101..=108`  | modifier mask `raw - 100`                    |
//! | `109..=208`  | HID keycode `raw - 108` with SHIFT held      |
//! | `209..=254`  | reserved, decodes as empty                   |
//! | `255`        | reflash sentinel                             |
//!
//! With the `legacy-reflash-alias` feature, `5` is a second reflash sentinel.

use bitflags::bitflags;

/// Offset subtracted from a modifier cell to get its modifier mask.
pub const MODIFIER_BASE: u8 = 100;
/// Offset subtracted from a shifted cell to get its HID keycode.
pub const SHIFT_BASE: u8 = 108;
/// Raw value that sends the keyboard into the bootloader.
pub const REFLASH: u8 = 255;
/// Older boards shipped with this value wired to reflash as well.
pub const LEGACY_REFLASH: u8 = 5;

/// Whether [`LEGACY_REFLASH`] is treated as a reflash sentinel.
pub const LEGACY_REFLASH_ALIAS: bool = cfg!(feature = "legacy-reflash-alias");

bitflags! {
    /// The HID boot report modifier byte (bit 0 = LCtrl, bit 7 = RGui).
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub struct Modifiers: u8 {
        const LCTRL = 0b0000_0001;
        const LSHIFT = 0b0000_0010;
        const LALT = 0b0000_0100;
        const LGUI = 0b0000_1000;
        const RCTRL = 0b0001_0000;
        const RSHIFT = 0b0010_0000;
        const RALT = 0b0100_0000;
        const RGUI = 0b1000_0000;
    }
}

impl Modifiers {
    /// The modifier implied by a shifted cell.
    pub const SHIFT: Modifiers = Modifiers::LSHIFT;
}

/// A decoded layout cell.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Keycode {
    /// Nothing happens when this cell is pressed.
    Empty,
    /// OR the mask into the report's modifier byte.
    Modifier(Modifiers),
    /// Report this HID keycode.
    Key(u8),
    /// Report this HID keycode and hold SHIFT.
    ShiftedKey(u8),
    /// Leave the scan loop and jump to the bootloader.
    Reflash,
}

/// Classify a raw table value. Every `u8` maps to exactly one variant.
pub const fn decode(raw: u8) -> Keycode {
    match raw {
        0 => Keycode::Empty,
        REFLASH => Keycode::Reflash,
        LEGACY_REFLASH if LEGACY_REFLASH_ALIAS => Keycode::Reflash,
        1..=100 => Keycode::Key(raw),
        101..=108 => Keycode::Modifier(Modifiers::from_bits_retain(raw - MODIFIER_BASE)),
        109..=208 => Keycode::ShiftedKey(raw - SHIFT_BASE),
        209..=254 => Keycode::Empty,
    }
}

/// Encode a HID keycode as a shifted cell.
pub const fn shifted(code: u8) -> u8 {
    code + SHIFT_BASE
}

/// Encode a modifier mask as a modifier-only cell.
pub const fn modifier(mask: Modifiers) -> u8 {
    mask.bits() + MODIFIER_BASE
}

/// HID keycodes from the Keyboard/Keypad usage page (0x07) that fit the
/// plain-key range.
pub mod usage {
    pub const A: u8 = 0x04;
    pub const B: u8 = 0x05;
    pub const C: u8 = 0x06;
    pub const D: u8 = 0x07;
    pub const E: u8 = 0x08;
    pub const F: u8 = 0x09;
    pub const G: u8 = 0x0A;
    pub const H: u8 = 0x0B;
    pub const I: u8 = 0x0C;
    pub const J: u8 = 0x0D;
    pub const K: u8 = 0x0E;
    pub const L: u8 = 0x0F;
    pub const M: u8 = 0x10;
    pub const N: u8 = 0x11;
    pub const O: u8 = 0x12;
    pub const P: u8 = 0x13;
    pub const Q: u8 = 0x14;
    pub const R: u8 = 0x15;
    pub const S: u8 = 0x16;
    pub const T: u8 = 0x17;
    pub const U: u8 = 0x18;
    pub const V: u8 = 0x19;
    pub const W: u8 = 0x1A;
    pub const X: u8 = 0x1B;
    pub const Y: u8 = 0x1C;
    pub const Z: u8 = 0x1D;

    pub const N1: u8 = 0x1E;
    pub const N2: u8 = 0x1F;
    pub const N3: u8 = 0x20;
    pub const N4: u8 = 0x21;
    pub const N5: u8 = 0x22;
    pub const N6: u8 = 0x23;
    pub const N7: u8 = 0x24;
    pub const N8: u8 = 0x25;
    pub const N9: u8 = 0x26;
    pub const N0: u8 = 0x27;

    pub const ENTER: u8 = 0x28;
    pub const ESCAPE: u8 = 0x29;
    pub const BACKSPACE: u8 = 0x2A;
    pub const TAB: u8 = 0x2B;
    pub const SPACE: u8 = 0x2C;
    pub const MINUS: u8 = 0x2D;
    pub const EQUAL: u8 = 0x2E;
    pub const LBRACKET: u8 = 0x2F;
    pub const RBRACKET: u8 = 0x30;
    pub const BACKSLASH: u8 = 0x31;
    pub const SEMICOLON: u8 = 0x33;
    pub const QUOTE: u8 = 0x34;
    pub const GRAVE: u8 = 0x35;
    pub const COMMA: u8 = 0x36;
    pub const DOT: u8 = 0x37;
    pub const SLASH: u8 = 0x38;

    pub const INSERT: u8 = 0x49;
    pub const PAGE_UP: u8 = 0x4B;
    pub const PAGE_DOWN: u8 = 0x4E;
}

/// Short label for a HID keycode, used when rendering layouts.
pub fn usage_name(code: u8) -> &'static str {
    match code {
        0x00 => "",
        0x01 => "ERR",
        0x02 => "POST",
        0x03 => "Undef",
        0x04 => "A",
        0x05 => "B",
        0x06 => "C",
        0x07 => "D",
        0x08 => "E",
        0x09 => "F",
        0x0A => "G",
        0x0B => "H",
        0x0C => "I",
        0x0D => "J",
        0x0E => "K",
        0x0F => "L",
        0x10 => "M",
        0x11 => "N",
        0x12 => "O",
        0x13 => "P",
        0x14 => "Q",
        0x15 => "R",
        0x16 => "S",
        0x17 => "T",
        0x18 => "U",
        0x19 => "V",
        0x1A => "W",
        0x1B => "X",
        0x1C => "Y",
        0x1D => "Z",
        0x1E => "1",
        0x1F => "2",
        0x20 => "3",
        0x21 => "4",
        0x22 => "5",
        0x23 => "6",
        0x24 => "7",
        0x25 => "8",
        0x26 => "9",
        0x27 => "0",
        0x28 => "Ent",
        0x29 => "Esc",
        0x2A => "Bksp",
        0x2B => "Tab",
        0x2C => "Spc",
        0x2D => "-",
        0x2E => "=",
        0x2F => "[",
        0x30 => "]",
        0x31 => "\\",
        0x32 => "#",
        0x33 => ";",
        0x34 => "'",
        0x35 => "`",
        0x36 => ",",
        0x37 => ".",
        0x38 => "/",
        0x39 => "Caps",
        0x3A => "F1",
        0x3B => "F2",
        0x3C => "F3",
        0x3D => "F4",
        0x3E => "F5",
        0x3F => "F6",
        0x40 => "F7",
        0x41 => "F8",
        0x42 => "F9",
        0x43 => "F10",
        0x44 => "F11",
        0x45 => "F12",
        0x46 => "PScr",
        0x47 => "ScrL",
        0x48 => "Paus",
        0x49 => "Ins",
        0x4A => "Home",
        0x4B => "PgUp",
        0x4C => "Del",
        0x4D => "End",
        0x4E => "PgDn",
        0x4F => "\u{2192}",
        0x50 => "\u{2190}",
        0x51 => "\u{2193}",
        0x52 => "\u{2191}",
        0x53 => "NumL",
        0x54 => "KP/",
        0x55 => "KP*",
        0x56 => "KP-",
        0x57 => "KP+",
        0x58 => "KPEn",
        0x59 => "KP1",
        0x5A => "KP2",
        0x5B => "KP3",
        0x5C => "KP4",
        0x5D => "KP5",
        0x5E => "KP6",
        0x5F => "KP7",
        0x60 => "KP8",
        0x61 => "KP9",
        0x62 => "KP0",
        0x63 => "KP.",
        0x64 => "<>",
        _ => "?",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        assert_eq!(decode(0), Keycode::Empty);
    }

    #[test]
    fn test_plain_range() {
        assert_eq!(decode(1), Keycode::Key(1));
        assert_eq!(decode(26), Keycode::Key(26));
        assert_eq!(decode(100), Keycode::Key(100));
    }

    #[test]
    fn test_modifier_boundaries() {
        assert_eq!(decode(101), Keycode::Modifier(Modifiers::LCTRL));
        assert_eq!(decode(102), Keycode::Modifier(Modifiers::LSHIFT));
        assert_eq!(decode(104), Keycode::Modifier(Modifiers::LALT));
        // 108 is the last modifier cell, not a shifted keycode 0.
        assert_eq!(decode(108), Keycode::Modifier(Modifiers::LGUI));
        assert_eq!(Modifiers::LGUI.bits(), 8);
    }

    #[test]
    fn test_shifted_boundaries() {
        assert_eq!(decode(109), Keycode::ShiftedKey(1));
        assert_eq!(decode(208), Keycode::ShiftedKey(100));
    }

    #[test]
    fn test_reserved_range_is_empty() {
        for raw in 209..=254u8 {
            assert_eq!(decode(raw), Keycode::Empty, "raw {}", raw);
        }
    }

    #[test]
    fn test_reflash_sentinel() {
        assert_eq!(decode(REFLASH), Keycode::Reflash);
    }

    #[cfg(feature = "legacy-reflash-alias")]
    #[test]
    fn test_legacy_alias_reflashes() {
        assert_eq!(decode(LEGACY_REFLASH), Keycode::Reflash);
    }

    #[cfg(not(feature = "legacy-reflash-alias"))]
    #[test]
    fn test_legacy_alias_is_plain_key() {
        assert_eq!(decode(LEGACY_REFLASH), Keycode::Key(usage::B));
    }

    #[test]
    fn test_every_value_has_one_category() {
        for raw in 0..=255u8 {
            let expected = match raw {
                0 | 209..=254 => "empty",
                255 => "reflash",
                5 if LEGACY_REFLASH_ALIAS => "reflash",
                1..=100 => "key",
                101..=108 => "modifier",
                _ => "shifted",
            };
            let got = match decode(raw) {
                Keycode::Empty => "empty",
                Keycode::Modifier(m) => {
                    assert!(!m.is_empty(), "raw {} has an empty modifier mask", raw);
                    "modifier"
                }
                Keycode::Key(code) => {
                    assert_eq!(code, raw);
                    "key"
                }
                Keycode::ShiftedKey(code) => {
                    assert!((1..=100).contains(&code));
                    "shifted"
                }
                Keycode::Reflash => "reflash",
            };
            assert_eq!(got, expected, "raw {}", raw);
        }
    }

    #[test]
    fn test_encode_helpers() {
        assert_eq!(shifted(usage::N1), 138);
        assert_eq!(decode(shifted(usage::N1)), Keycode::ShiftedKey(usage::N1));
        assert_eq!(modifier(Modifiers::LSHIFT), 102);
    }

    #[test]
    fn test_usage_names() {
        assert_eq!(usage_name(usage::W), "W");
        assert_eq!(usage_name(usage::ENTER), "Ent");
        assert_eq!(usage_name(0xE0), "?");
    }
}
