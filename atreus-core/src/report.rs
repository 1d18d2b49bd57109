//! Per-cycle report accumulation.

use heapless::Vec;
use log::debug;

use crate::keycode::Modifiers;

/// Keycode slots in a boot protocol report.
pub const MAX_KEYS: usize = 6;

/// Standard USB HID keyboard report (8 bytes).
/// Byte 0: modifier keys bitmask
/// Byte 1: reserved (0x00)
/// Bytes 2-7: up to 6 simultaneous keycodes
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct KeyboardReport {
    pub modifiers: u8,
    pub reserved: u8,
    pub keys: [u8; MAX_KEYS],
}

impl KeyboardReport {
    pub const fn empty() -> Self {
        Self {
            modifiers: 0,
            reserved: 0,
            keys: [0; MAX_KEYS],
        }
    }

    /// Wire layout, in the order the IN endpoint expects.
    pub fn to_bytes(&self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[0] = self.modifiers;
        out[1] = self.reserved;
        out[2..].copy_from_slice(&self.keys);
        out
    }
}

/// Modifier byte and pressed keycodes gathered over one sweep.
///
/// Keycodes keep scan order (row-major, ascending column). Once six are
/// held, further keycodes are dropped for the rest of the cycle.
#[derive(Clone, Debug, Default)]
pub struct Accumulator {
    modifiers: Modifiers,
    keys: Vec<u8, MAX_KEYS>,
}

impl Accumulator {
    pub const fn new() -> Self {
        Self {
            modifiers: Modifiers::empty(),
            keys: Vec::new(),
        }
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn keys(&self) -> &[u8] {
        &self.keys
    }

    pub fn add_modifiers(&mut self, mods: Modifiers) {
        self.modifiers |= mods;
    }

    /// Append a keycode. Returns `false` and drops it when all slots are taken.
    pub fn push_key(&mut self, code: u8) -> bool {
        match self.keys.push(code) {
            Ok(()) => true,
            Err(code) => {
                debug!("dropping keycode {}: {} keys already held", code, MAX_KEYS);
                false
            }
        }
    }

    pub fn clear(&mut self) {
        self.modifiers = Modifiers::empty();
        self.keys.clear();
    }

    /// Snapshot as a boot protocol report; unused slots are zero.
    pub fn report(&self) -> KeyboardReport {
        let mut report = KeyboardReport::empty();
        report.modifiers = self.modifiers.bits();
        report.keys[..self.keys.len()].copy_from_slice(&self.keys);
        report
    }
}
