//! Hand-off to the Teensy HalfKay bootloader.

use avr_device::atmega32u4::Peripherals;

/// Detach from USB, put every peripheral back to its reset state and jump
/// to the bootloader at 0x7E00. The firmware image does not run again until it is
/// reflashed or the board is power-cycled.
pub fn enter(dp: &Peripherals) -> ! {
    avr_device::interrupt::disable();

    // Detach first so the host sees the keyboard go away.
    dp.USB_DEVICE.udcon.write(|w| w.detach().set_bit());
    dp.USB_DEVICE.usbcon.write(|w| w.frzclk().set_bit());
    dp.USART1.ucsr1b.write(|w| unsafe { w.bits(0) });
    crate::delay_ms(5);

    disable_peripherals(dp);
    reset_ports(dp);

    unsafe { core::arch::asm!("jmp 0x7E00", options(noreturn)) }
}

fn disable_peripherals(dp: &Peripherals) {
    dp.EXINT.eimsk.write(|w| w.bits(0));
    dp.EXINT.pcicr.write(|w| unsafe { w.bits(0) });
    dp.SPI.spcr.write(|w| unsafe { w.bits(0) });
    dp.AC.acsr.write(|w| unsafe { w.bits(0) });
    dp.EEPROM.eecr.write(|w| unsafe { w.bits(0) });
    dp.ADC.adcsra.write(|w| unsafe { w.bits(0) });
    dp.TC0.timsk0.write(|w| unsafe { w.bits(0) });
    dp.TC1.timsk1.write(|w| unsafe { w.bits(0) });
    dp.TC3.timsk3.write(|w| unsafe { w.bits(0) });
    dp.TC4.timsk4.write(|w| unsafe { w.bits(0) });
    dp.USART1.ucsr1b.write(|w| unsafe { w.bits(0) });
    dp.TWI.twcr.write(|w| unsafe { w.bits(0) });
}

/// Direction and output registers back to their power-on value (inputs,
/// no pull-ups).
fn reset_ports(dp: &Peripherals) {
    dp.PORTB.ddrb.write(|w| unsafe { w.bits(0) });
    dp.PORTC.ddrc.write(|w| unsafe { w.bits(0) });
    dp.PORTD.ddrd.write(|w| unsafe { w.bits(0) });
    dp.PORTE.ddre.write(|w| unsafe { w.bits(0) });
    dp.PORTF.ddrf.write(|w| unsafe { w.bits(0) });

    dp.PORTB.portb.write(|w| unsafe { w.bits(0) });
    dp.PORTC.portc.write(|w| unsafe { w.bits(0) });
    dp.PORTD.portd.write(|w| unsafe { w.bits(0) });
    dp.PORTE.porte.write(|w| unsafe { w.bits(0) });
    dp.PORTF.portf.write(|w| unsafe { w.bits(0) });
}
