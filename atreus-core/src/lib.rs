//! Scan, resolve and report pipeline for the Atreus keyboard.
//!
//! This crate is `no_std` so the same code drives the AVR firmware and the
//! host-side CLI simulator. Hardware access goes through [`matrix::KeyMatrix`]
//! and [`keyboard::ReportSink`]; everything else is plain data, including
//! the classification of USB control requests in [`hid`].

#![cfg_attr(not(test), no_std)]

pub mod hid;
pub mod keycode;
pub mod keyboard;
pub mod layout;
pub mod matrix;
pub mod report;
pub mod resolver;

pub use keyboard::{Keyboard, ReportSink, State, Sweep};
pub use keycode::{decode, Keycode, Modifiers};
pub use layout::Layer;
pub use matrix::{ColumnSet, KeyMatrix};
pub use report::{Accumulator, KeyboardReport, MAX_KEYS};
pub use resolver::Resolution;

/// Number of rows in the matrix.
pub const ROWS: usize = 4;
/// Number of columns in the matrix.
pub const COLS: usize = 11;
