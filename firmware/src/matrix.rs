//! Atreus matrix wiring on the Teensy 2.0.
//!
//! Rows are driven from PD0-PD3 (active low). Columns are read on
//! PB0-PB7 (columns 0-7) and PF4-PF6 (columns 8-10), inputs with
//! pull-ups. The Fn key sits on row 3 / column 7, so the function line
//! is PB7 read while row 3 is driven.
//!
//! ```text
//! row:  0   1   2   3
//! pin:  D0  D1  D2  D3
//!
//! col:  0   1   2   3   4   5   6   7   8   9   10
//! pin:  B0  B1  B2  B3  B4  B5  B6  B7  F4  F5  F6
//! ```

use atreus_core::{KeyMatrix, ROWS};
use avr_device::atmega32u4::Peripherals;

/// Status LED on PD5, kept lit while scanning.
const STATUS_LED: u8 = 1 << 5;
/// Row driven while sampling the Fn key.
const FN_ROW: usize = ROWS - 1;
/// PB7, the Fn key's column.
const FN_MASK: u8 = 1 << 7;
/// Row settle time before sampling the columns.
const SETTLE_US: u8 = 50;

/// Configure the row drivers, column pull-ups and the status LED.
pub fn init_gpio(dp: &Peripherals) {
    // Whole of port D is output: rows, LED and unused pins.
    dp.PORTD.ddrd.write(|w| unsafe { w.bits(0xFF) });
    dp.PORTD.portd.write(|w| unsafe { w.bits(0xFF) });

    // Columns as inputs with pull-ups.
    dp.PORTB.ddrb.write(|w| unsafe { w.bits(0x00) });
    dp.PORTB.portb.write(|w| unsafe { w.bits(0xFF) });
    dp.PORTF.ddrf.write(|w| unsafe { w.bits(0x00) });
    dp.PORTF.portf.write(|w| unsafe { w.bits(0xFF) });
}

/// [`KeyMatrix`] over the Teensy's GPIO ports.
pub struct TeensyMatrix<'a> {
    dp: &'a Peripherals,
}

impl<'a> TeensyMatrix<'a> {
    pub fn new(dp: &'a Peripherals) -> Self {
        Self { dp }
    }
}

impl KeyMatrix for TeensyMatrix<'_> {
    fn activate_row(&mut self, row: usize) {
        let level = !(1u8 << row) | STATUS_LED;
        self.dp.PORTD.portd.write(|w| unsafe { w.bits(level) });
    }

    fn read_columns(&mut self) -> u16 {
        let pinb = self.dp.PORTB.pinb.read().bits();
        let pinf = self.dp.PORTF.pinf.read().bits();
        pinb as u16 | ((pinf >> 4) as u16) << 8
    }

    fn function_line(&mut self) -> bool {
        self.activate_row(FN_ROW);
        self.settle();
        self.dp.PORTB.pinb.read().bits() & FN_MASK == 0
    }

    fn settle(&mut self) {
        delay_us(SETTLE_US);
    }
}

/// Busy-wait delay in microseconds (approximate, at 16MHz).
#[inline(always)]
fn delay_us(us: u8) {
    for _ in 0..us {
        // 16 cycles per microsecond, ~4 cycles per iteration.
        for _ in 0..4u8 {
            unsafe { core::arch::asm!("nop") };
        }
    }
}
