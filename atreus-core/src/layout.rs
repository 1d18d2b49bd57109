//! Layout tables for the Atreus.
//!
//! The Atreus has a 4×11 matrix: five columns per hand plus a middle
//! column that only carries keys on the bottom two rows. Cells hold raw
//! values in the encoding described in [`crate::keycode`].

use crate::keycode::usage::*;
use crate::keycode::{modifier, shifted, Modifiers, REFLASH};
use crate::{COLS, ROWS};

/// A grid of raw cell values, indexed `[row][col]`.
pub type LayoutTable = [[u8; COLS]; ROWS];

/// Which table a sweep resolves against.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Layer {
    Base,
    Function,
}

impl Layer {
    pub const ALL: [Layer; 2] = [Layer::Base, Layer::Function];

    pub fn table(self) -> &'static LayoutTable {
        match self {
            Layer::Base => &BASE_LAYOUT,
            Layer::Function => &FN_LAYOUT,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Layer::Base => "Base",
            Layer::Function => "Fn",
        }
    }
}

/// Empty cell.
const ___: u8 = 0;

const CTRL: u8 = modifier(Modifiers::LCTRL);
const SHFT: u8 = modifier(Modifiers::LSHIFT);
const ALT: u8 = modifier(Modifiers::LALT);
const GUI: u8 = modifier(Modifiers::LGUI);
const FLSH: u8 = REFLASH;

const ESC: u8 = ESCAPE;
const BSP: u8 = BACKSPACE;
const SPC: u8 = SPACE;
const ENT: u8 = ENTER;
const SCLN: u8 = SEMICOLON;
const QUOT: u8 = QUOTE;
const LBRC: u8 = LBRACKET;
const RBRC: u8 = RBRACKET;
const BSLS: u8 = BACKSLASH;
const COMM: u8 = COMMA;
const SLSH: u8 = SLASH;
const GRV: u8 = GRAVE;
const EQL: u8 = EQUAL;
const MIN: u8 = MINUS;
const PGUP: u8 = PAGE_UP;
const PGDN: u8 = PAGE_DOWN;

// Shifted symbols on a US host layout.
const EXLM: u8 = shifted(N1);
const AT: u8 = shifted(N2);
const HASH: u8 = shifted(N3);
const DLR: u8 = shifted(N4);
const PERC: u8 = shifted(N5);
const CIRC: u8 = shifted(N6);
const ASTR: u8 = shifted(N8);
const LPRN: u8 = shifted(N9);
const RPRN: u8 = shifted(N0);
const UNDS: u8 = shifted(MINUS);
const PLUS: u8 = shifted(EQUAL);
const PIPE: u8 = shifted(BACKSLASH);
const TILD: u8 = shifted(GRAVE);
const LCBR: u8 = shifted(LBRACKET);
const SINS: u8 = shifted(INSERT);

/// Default QWERTY layer.
///
/// Row 2 column 4 holds `B`, which is also the legacy reflash alias; with
/// `legacy-reflash-alias` enabled that key reboots into the bootloader.
pub static BASE_LAYOUT: LayoutTable = [
    [Q, W, E, R, T, ___, Y, U, I, O, P],
    [A, S, D, F, G, ___, H, J, K, L, SCLN],
    [Z, X, C, V, B, CTRL, N, M, COMM, DOT, SLSH],
    [ESC, TAB, GUI, SHFT, BSP, ALT, SPC, ___, QUOT, LBRC, ENT],
];

/// Symbols, numpad and navigation, active while the function line is held.
pub static FN_LAYOUT: LayoutTable = [
    [EXLM, AT, UNDS, PLUS, PIPE, ___, PGUP, N7, N8, N9, ASTR],
    [HASH, DLR, LPRN, RPRN, GRV, ___, PGDN, N4, N5, N6, PLUS],
    [PERC, CIRC, MIN, EQL, TILD, CTRL, BSLS, N1, N2, N3, LCBR],
    [FLSH, SINS, GUI, SHFT, ___, ALT, ___, ___, DOT, N0, RBRC],
];
