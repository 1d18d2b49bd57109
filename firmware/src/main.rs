//! Atreus keyboard firmware for ATmega32U4 (Teensy 2.0).
//!
//! Each pass of the main loop services the USB control endpoint, then runs
//! one scan cycle from `atreus-core`: sample the Fn line, sweep the four
//! rows, send a boot keyboard report, clear. Pressing a reflash cell hands
//! the chip to the HalfKay bootloader.

#![no_std]
#![no_main]
#![feature(asm_experimental_arch)]

mod bootloader;
mod hid;
mod matrix;

use atreus_core::{Keyboard, State};
use avr_device::atmega32u4::Peripherals;

use hid::UsbKeyboard;
use matrix::TeensyMatrix;

/// Time given to the host after configuration before the first report.
const STARTUP_GRACE_MS: u16 = 1000;

/// On AVR a panic just parks the CPU.
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}

/// Main entry point.
#[no_mangle]
pub extern "C" fn main() -> ! {
    let dp = unsafe { Peripherals::steal() };

    // Run at the full 16MHz: unlock CLKPR, then prescaler = 1.
    dp.CPU.clkpr.write(|w| w.clkpce().set_bit());
    dp.CPU.clkpr.write(|w| unsafe { w.bits(0) });

    matrix::init_gpio(&dp);

    let mut usb = UsbKeyboard::new();
    usb.init(&dp);

    while !usb.is_configured() {
        usb.poll(&dp);
    }
    // Keep answering control requests while the host finishes setting up.
    for _ in 0..STARTUP_GRACE_MS {
        usb.poll(&dp);
        delay_ms(1);
    }

    let mut keyboard = Keyboard::new(TeensyMatrix::new(&dp));

    loop {
        usb.poll(&dp);

        if keyboard.cycle(&mut usb.link(&dp)) == State::Reflash {
            bootloader::enter(&dp);
        }
    }
}

/// Busy-wait delay in milliseconds (approximate, at 16MHz).
pub fn delay_ms(ms: u16) {
    for _ in 0..ms {
        // ~1ms at 16MHz: 16000 cycles / 4 cycles per loop iteration
        for _ in 0..4000u16 {
            unsafe { core::arch::asm!("nop") };
        }
    }
}
