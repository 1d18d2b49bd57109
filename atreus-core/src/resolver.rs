//! Layer selection and keycode resolution.

use log::{info, trace};

use crate::keycode::{decode, Keycode, Modifiers};
use crate::layout::Layer;
use crate::matrix::KeyMatrix;
use crate::report::Accumulator;

/// What the scan loop should do after resolving a cell.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Resolution {
    Continue,
    /// A reflash sentinel was pressed; scanning must stop.
    Reflash,
}

/// Pick the table for this sweep from the function line.
///
/// Called once before row 0 so every row of a sweep uses the same layer.
pub fn select_layer<M: KeyMatrix>(matrix: &mut M) -> Layer {
    let layer = if matrix.function_line() {
        Layer::Function
    } else {
        Layer::Base
    };
    trace!("sweep layer: {}", layer.name());
    layer
}

/// Apply one decoded cell to the accumulator.
pub fn resolve(keycode: Keycode, acc: &mut Accumulator) -> Resolution {
    match keycode {
        Keycode::Empty => {}
        Keycode::Modifier(mods) => acc.add_modifiers(mods),
        Keycode::Key(code) => {
            acc.push_key(code);
        }
        Keycode::ShiftedKey(code) => {
            // A dropped key must not leave SHIFT behind.
            if acc.push_key(code) {
                acc.add_modifiers(Modifiers::SHIFT);
            }
        }
        Keycode::Reflash => {
            info!("reflash key pressed");
            return Resolution::Reflash;
        }
    }
    Resolution::Continue
}

/// Decode a raw table value and apply it.
pub fn resolve_raw(raw: u8, acc: &mut Accumulator) -> Resolution {
    resolve(decode(raw), acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::tests::FakeMatrix;

    #[test]
    fn test_select_layer() {
        assert_eq!(select_layer(&mut FakeMatrix::new()), Layer::Base);
        assert_eq!(
            select_layer(&mut FakeMatrix::new().with_fn(true)),
            Layer::Function
        );
    }

    #[test]
    fn test_zero_is_noop() {
        let mut acc = Accumulator::new();
        assert_eq!(resolve_raw(0, &mut acc), Resolution::Continue);
        assert_eq!(acc.report(), Accumulator::new().report());
    }

    #[test]
    fn test_plain_key() {
        let mut acc = Accumulator::new();
        resolve_raw(26, &mut acc);
        assert_eq!(acc.keys(), &[26]);
        assert!(acc.modifiers().is_empty());
    }

    #[test]
    fn test_modifier_only() {
        let mut acc = Accumulator::new();
        resolve_raw(101, &mut acc);
        assert_eq!(acc.modifiers().bits(), 1);
        assert!(acc.keys().is_empty());

        resolve_raw(108, &mut acc);
        assert_eq!(acc.modifiers().bits(), 1 | 8);
        assert!(acc.keys().is_empty());
    }

    #[test]
    fn test_shifted_key_sets_shift() {
        let mut acc = Accumulator::new();
        resolve_raw(109, &mut acc);
        assert_eq!(acc.keys(), &[1]);
        assert_eq!(acc.modifiers(), Modifiers::SHIFT);
    }

    #[test]
    fn test_dropped_shifted_key_leaves_modifiers_alone() {
        let mut acc = Accumulator::new();
        for code in 10..16 {
            resolve_raw(code, &mut acc);
        }
        resolve_raw(138, &mut acc);
        assert_eq!(acc.keys(), &[10, 11, 12, 13, 14, 15]);
        assert!(acc.modifiers().is_empty());
    }

    #[test]
    fn test_modifier_applies_when_full() {
        let mut acc = Accumulator::new();
        for code in 10..16 {
            resolve_raw(code, &mut acc);
        }
        resolve_raw(104, &mut acc);
        assert_eq!(acc.modifiers(), Modifiers::LALT);
    }

    #[test]
    fn test_reflash_even_when_full() {
        let mut acc = Accumulator::new();
        for code in 10..16 {
            resolve_raw(code, &mut acc);
        }
        assert_eq!(resolve_raw(255, &mut acc), Resolution::Reflash);
    }
}
