//! USB HID boot keyboard on the ATmega32U4's built-in USB controller.
//!
//! Polled rather than interrupt driven: [`UsbKeyboard::poll`] services bus
//! resets and SETUP packets on EP0, [`UsbKeyboard::send_report`] pushes
//! one 8-byte report through the interrupt IN endpoint and blocks until
//! the controller has taken it.

use atreus_core::hid::{Request, Setup, REPORT_DESCRIPTOR};
use atreus_core::{KeyboardReport, ReportSink};
use avr_device::atmega32u4::Peripherals;

const EP0_SIZE: u8 = 64; // Control endpoint size
const EP1_SIZE: u8 = 8; // Interrupt IN endpoint size (keyboard reports)
const KEYBOARD_EP: u8 = 1;

/// Identifiers of the running keyboard. The host tool looks for these when
/// asking for a reboot into the bootloader.
const VENDOR_ID: u16 = 0x16C0;
const PRODUCT_ID: u16 = 0x047E;

static DEVICE_DESCRIPTOR: [u8; 18] = [
    18,   // bLength
    1,    // bDescriptorType (Device)
    0x00, 0x02, // bcdUSB (2.0)
    0,    // bDeviceClass (defined at interface level)
    0,    // bDeviceSubClass
    0,    // bDeviceProtocol
    EP0_SIZE, // bMaxPacketSize0
    VENDOR_ID as u8, (VENDOR_ID >> 8) as u8,
    PRODUCT_ID as u8, (PRODUCT_ID >> 8) as u8,
    0x00, 0x01, // bcdDevice (1.0)
    1,    // iManufacturer
    2,    // iProduct
    0,    // iSerialNumber
    1,    // bNumConfigurations
];

/// Offset of the HID class descriptor inside [`CONFIG_DESCRIPTOR`].
const HID_DESCRIPTOR_OFFSET: usize = 18;

static CONFIG_DESCRIPTOR: [u8; 34] = [
    // Configuration
    9, 2, 34, 0, // bLength, bDescriptorType, wTotalLength
    1,    // bNumInterfaces
    1,    // bConfigurationValue
    0,    // iConfiguration
    0x80, // bmAttributes (bus powered)
    50,   // bMaxPower (100mA)
    // Interface: HID, boot subclass, keyboard protocol
    9, 4, 0, 0, 1, 3, 1, 1, 0,
    // HID
    9,    // bLength
    0x21, // bDescriptorType (HID)
    0x11, 0x01, // bcdHID (1.11)
    0,    // bCountryCode
    1,    // bNumDescriptors
    0x22, // bDescriptorType (Report)
    REPORT_DESCRIPTOR.len() as u8, 0,
    // Endpoint: EP1 IN, interrupt, polled every 1ms
    7, 5, 0x80 | KEYBOARD_EP, 0x03, EP1_SIZE, 0, 1,
];

static LANGUAGES: [u8; 4] = [4, 3, 0x09, 0x04]; // English (US)
static MANUFACTURER: [u8; 14] = string_descriptor("Atreus");
static PRODUCT: [u8; 18] = string_descriptor("Keyboard");

/// Build a USB string descriptor from ASCII text.
const fn string_descriptor<const N: usize>(text: &str) -> [u8; N] {
    let bytes = text.as_bytes();
    let mut out = [0u8; N];
    out[0] = N as u8;
    out[1] = 3;
    let mut i = 0;
    while i < bytes.len() {
        out[2 + 2 * i] = bytes[i];
        i += 1;
    }
    out
}

/// USB device state.
pub struct UsbKeyboard {
    configuration: u8,
    idle_rate: u8,
    protocol: u8,
    last_report: KeyboardReport,
}

impl UsbKeyboard {
    pub const fn new() -> Self {
        Self {
            configuration: 0,
            idle_rate: 0,
            protocol: 1,
            last_report: KeyboardReport::empty(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.configuration != 0
    }

    /// Bring up the PLL and the USB controller and attach to the bus.
    pub fn init(&mut self, dp: &Peripherals) {
        let usb = &dp.USB_DEVICE;

        usb.uhwcon.write(|w| w.uvrege().set_bit());
        usb.usbcon.write(|w| w.usbe().set_bit().otgpade().set_bit());

        // 16MHz crystal: PINDIV=1 feeds 8MHz into the PLL.
        dp.PLL.pllcsr.write(|w| w.pindiv().set_bit().plle().set_bit());
        while dp.PLL.pllcsr.read().plock().bit_is_clear() {}

        usb.usbcon.modify(|_, w| w.frzclk().clear_bit());
        usb.udcon.modify(|_, w| w.detach().clear_bit());
        usb.udien.write(|w| w.eorste().set_bit());

        self.configuration = 0;
    }

    /// Handle a pending bus reset or SETUP packet. Call from the main loop.
    pub fn poll(&mut self, dp: &Peripherals) {
        let usb = &dp.USB_DEVICE;

        if usb.udint.read().eorsti().bit_is_set() {
            usb.udint.modify(|_, w| w.eorsti().clear_bit());
            self.configure_ep0(dp);
            self.configuration = 0;
        }

        self.select_endpoint(dp, 0);
        if usb.ueintx.read().rxstpi().bit_is_set() {
            let mut raw = [0u8; 8];
            for byte in raw.iter_mut() {
                *byte = usb.uedatx.read().bits();
            }
            usb.ueintx.modify(|_, w| w.rxstpi().clear_bit());
            self.handle_setup(dp, &Setup::from_bytes(raw));
        }
    }

    /// Transmit one report, waiting for the IN bank to free up. Reports
    /// are dropped while the device is unconfigured or if the bus resets
    /// during the wait.
    pub fn send_report(&mut self, dp: &Peripherals, report: &KeyboardReport) {
        if !self.is_configured() {
            return;
        }

        let usb = &dp.USB_DEVICE;
        self.select_endpoint(dp, KEYBOARD_EP);

        while usb.ueintx.read().rwal().bit_is_clear() {
            if usb.udint.read().eorsti().bit_is_set() {
                return;
            }
        }

        for byte in report.to_bytes() {
            usb.uedatx.write(|w| w.bits(byte));
        }
        usb.ueintx
            .modify(|_, w| w.fifocon().clear_bit().txini().clear_bit());

        self.last_report = *report;
    }

    /// Borrow the device as the report transport for one scan cycle.
    pub fn link<'a>(&'a mut self, dp: &'a Peripherals) -> HostLink<'a> {
        HostLink { usb: self, dp }
    }

    fn handle_setup(&mut self, dp: &Peripherals, setup: &Setup) {
        match Request::decode(setup) {
            Request::GetDescriptor { kind, index } => {
                self.get_descriptor(dp, kind, index, setup.length)
            }
            Request::GetStatus => self.control_in(dp, &[0, 0], setup.length),
            Request::SetAddress(address) => {
                let usb = &dp.USB_DEVICE;
                // The new address only applies after the status stage.
                self.ack(dp);
                while usb.ueintx.read().txini().bit_is_clear() {}
                usb.udaddr
                    .write(|w| w.uadd().bits(address).adden().set_bit());
            }
            Request::SetConfiguration(configuration) => {
                self.ack(dp);
                self.configuration = configuration;
                if self.is_configured() {
                    self.configure_ep1(dp);
                }
            }
            Request::GetConfiguration => {
                let configuration = self.configuration;
                self.control_in(dp, &[configuration], setup.length);
            }
            Request::GetReport => {
                let bytes = self.last_report.to_bytes();
                self.control_in(dp, &bytes, setup.length);
            }
            Request::GetIdle => {
                let idle = self.idle_rate;
                self.control_in(dp, &[idle], setup.length);
            }
            Request::GetProtocol => {
                let protocol = self.protocol;
                self.control_in(dp, &[protocol], setup.length);
            }
            Request::SetReport { length } => {
                // LED state; there are no LEDs to drive.
                self.control_out_discard(dp, length);
                self.ack(dp);
            }
            Request::SetIdle(rate) => {
                self.idle_rate = rate;
                self.ack(dp);
            }
            Request::SetProtocol(protocol) => {
                self.protocol = protocol;
                self.ack(dp);
            }
            Request::Reboot => {
                self.ack(dp);
                crate::bootloader::enter(dp);
            }
            Request::Unsupported => self.stall(dp),
        }
    }

    fn get_descriptor(&self, dp: &Peripherals, kind: u8, index: u8, requested: u16) {
        let descriptor: &[u8] = match (kind, index) {
            (0x01, _) => &DEVICE_DESCRIPTOR,
            (0x02, _) => &CONFIG_DESCRIPTOR,
            (0x03, 0) => &LANGUAGES,
            (0x03, 1) => &MANUFACTURER,
            (0x03, 2) => &PRODUCT,
            (0x21, _) => &CONFIG_DESCRIPTOR[HID_DESCRIPTOR_OFFSET..HID_DESCRIPTOR_OFFSET + 9],
            (0x22, _) => REPORT_DESCRIPTOR,
            _ => return self.stall(dp),
        };
        self.control_in(dp, descriptor, requested);
    }

    fn configure_ep0(&self, dp: &Peripherals) {
        let usb = &dp.USB_DEVICE;

        self.select_endpoint(dp, 0);
        usb.ueconx.write(|w| w.epen().set_bit());
        usb.uecfg0x.write(|w| w.eptype().bits(0b00));
        // 64 bytes, one bank
        usb.uecfg1x.write(|w| w.epsize().bits(0b011).alloc().set_bit());
    }

    fn configure_ep1(&self, dp: &Peripherals) {
        let usb = &dp.USB_DEVICE;

        self.select_endpoint(dp, KEYBOARD_EP);
        usb.ueconx.write(|w| w.epen().set_bit());
        // Interrupt, IN
        usb.uecfg0x.write(|w| w.eptype().bits(0b11).epdir().set_bit());
        // 8 bytes, one bank
        usb.uecfg1x.write(|w| w.epsize().bits(0b000).alloc().set_bit());
        self.select_endpoint(dp, 0);
    }

    fn select_endpoint(&self, dp: &Peripherals, ep: u8) {
        dp.USB_DEVICE.uenum.write(|w| w.bits(ep & 0x07));
    }

    /// Zero-length IN packet for the status stage.
    fn ack(&self, dp: &Peripherals) {
        dp.USB_DEVICE.ueintx.modify(|_, w| w.txini().clear_bit());
    }

    /// Data stage of a control IN transfer, split into EP0-sized packets.
    fn control_in(&self, dp: &Peripherals, data: &[u8], requested: u16) {
        let usb = &dp.USB_DEVICE;
        let len = core::cmp::min(data.len(), requested as usize);

        for packet in data[..len].chunks(EP0_SIZE as usize) {
            while usb.ueintx.read().txini().bit_is_clear() {}
            for &byte in packet {
                usb.uedatx.write(|w| w.bits(byte));
            }
            usb.ueintx.modify(|_, w| w.txini().clear_bit());
        }

        // Status stage: host answers with a ZLP.
        while usb.ueintx.read().rxouti().bit_is_clear() {}
        usb.ueintx.modify(|_, w| w.rxouti().clear_bit());
    }

    /// Data stage of a control OUT transfer whose payload is not needed.
    fn control_out_discard(&self, dp: &Peripherals, length: u16) {
        let usb = &dp.USB_DEVICE;
        let mut remaining = length;

        while remaining > 0 {
            while usb.ueintx.read().rxouti().bit_is_clear() {}
            let packet = core::cmp::min(remaining, EP0_SIZE as u16);
            for _ in 0..packet {
                let _ = usb.uedatx.read().bits();
            }
            usb.ueintx.modify(|_, w| w.rxouti().clear_bit());
            remaining -= packet;
        }
    }

    fn stall(&self, dp: &Peripherals) {
        dp.USB_DEVICE.ueconx.modify(|_, w| w.stallrq().set_bit());
    }
}

/// [`ReportSink`] over the keyboard endpoint.
pub struct HostLink<'a> {
    usb: &'a mut UsbKeyboard,
    dp: &'a Peripherals,
}

impl ReportSink for HostLink<'_> {
    fn send(&mut self, report: &KeyboardReport) {
        self.usb.send_report(self.dp, report);
    }
}
