//! The scan-resolve-report cycle.
//!
//! One cycle is: sample the function line, sweep every row resolving
//! pressed cells into the accumulator, hand the report to the transport,
//! clear. Pressing a reflash cell moves the keyboard into
//! [`State::Reflash`], which is terminal: no further rows are scanned and
//! no report is sent for that cycle or any later one.

use log::{trace, warn};

use crate::matrix::{scan_row, KeyMatrix};
use crate::report::{Accumulator, KeyboardReport};
use crate::resolver::{resolve_raw, select_layer, Resolution};

/// Transport that delivers a finished report to the host. `send` may
/// block until the endpoint accepts it.
pub trait ReportSink {
    fn send(&mut self, report: &KeyboardReport);
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum State {
    Scanning,
    /// Waiting to be handed to the bootloader. Never left.
    Reflash,
}

/// Outcome of a single sweep over the matrix.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Sweep {
    Complete,
    Reflash,
}

pub struct Keyboard<M> {
    matrix: M,
    accumulator: Accumulator,
    state: State,
}

impl<M: KeyMatrix> Keyboard<M> {
    pub const fn new(matrix: M) -> Self {
        Self {
            matrix,
            accumulator: Accumulator::new(),
            state: State::Scanning,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn accumulator(&self) -> &Accumulator {
        &self.accumulator
    }

    pub fn matrix(&self) -> &M {
        &self.matrix
    }

    pub fn matrix_mut(&mut self) -> &mut M {
        &mut self.matrix
    }

    /// Scan every row into the accumulator without sending or clearing.
    pub fn sweep(&mut self) -> Sweep {
        if self.state == State::Reflash {
            warn!("sweep requested after reflash");
            return Sweep::Reflash;
        }

        let table = select_layer(&mut self.matrix).table();
        for (row, cells) in table.iter().enumerate() {
            let columns = scan_row(&mut self.matrix, row);
            if columns.is_empty() {
                continue;
            }
            trace!("row {}: {} pressed", row, columns.len());
            for col in columns {
                if resolve_raw(cells[col], &mut self.accumulator) == Resolution::Reflash {
                    self.state = State::Reflash;
                    return Sweep::Reflash;
                }
            }
        }
        Sweep::Complete
    }

    /// Run one full cycle: sweep, send, clear.
    pub fn cycle<S: ReportSink>(&mut self, sink: &mut S) -> State {
        if self.sweep() == Sweep::Complete {
            sink.send(&self.accumulator.report());
            self.accumulator.clear();
        }
        self.state
    }
}
