//! USB HID boot keyboard: report descriptor and the control requests the
//! keyboard answers on endpoint 0.
//!
//! The firmware owns the registers; this module only classifies SETUP
//! packets so every request the descriptor implies has an answer.

// Standard requests
const GET_STATUS: u8 = 0x00;
const SET_ADDRESS: u8 = 0x05;
const GET_DESCRIPTOR: u8 = 0x06;
const GET_CONFIGURATION: u8 = 0x08;
const SET_CONFIGURATION: u8 = 0x09;

// HID class requests
const HID_GET_REPORT: u8 = 0x01;
const HID_GET_IDLE: u8 = 0x02;
const HID_GET_PROTOCOL: u8 = 0x03;
const HID_SET_REPORT: u8 = 0x09;
const HID_SET_IDLE: u8 = 0x0A;
const HID_SET_PROTOCOL: u8 = 0x0B;

/// Vendor request: enter the bootloader.
pub const VENDOR_REBOOT: u8 = 0xFF;

/// HID report descriptor for a boot protocol keyboard.
pub const REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x06, // Usage (Keyboard)
    0xA1, 0x01, // Collection (Application)
    // Modifier byte
    0x05, 0x07, //   Usage Page (Key Codes)
    0x19, 0xE0, //   Usage Minimum (224)
    0x29, 0xE7, //   Usage Maximum (231)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x08, //   Report Count (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    // Reserved byte
    0x95, 0x01, //   Report Count (1)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x03, //   Input (Constant)
    // LED output report, delivered by SET_REPORT and discarded
    0x95, 0x05, //   Report Count (5)
    0x75, 0x01, //   Report Size (1)
    0x05, 0x08, //   Usage Page (LEDs)
    0x19, 0x01, //   Usage Minimum (1)
    0x29, 0x05, //   Usage Maximum (5)
    0x91, 0x02, //   Output (Data, Variable, Absolute)
    0x95, 0x01, //   Report Count (1)
    0x75, 0x03, //   Report Size (3)
    0x91, 0x03, //   Output (Constant)
    // Six keycode slots
    0x95, 0x06, //   Report Count (6)
    0x75, 0x08, //   Report Size (8)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x68, //   Logical Maximum (104)
    0x05, 0x07, //   Usage Page (Key Codes)
    0x19, 0x00, //   Usage Minimum (0)
    0x29, 0x68, //   Usage Maximum (104)
    0x81, 0x00, //   Input (Data, Array)
    0xC0, // End Collection
];

/// An 8-byte SETUP packet.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Setup {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub length: u16,
}

impl Setup {
    pub fn from_bytes(raw: [u8; 8]) -> Self {
        Self {
            request_type: raw[0],
            request: raw[1],
            value: u16::from_le_bytes([raw[2], raw[3]]),
            index: u16::from_le_bytes([raw[4], raw[5]]),
            length: u16::from_le_bytes([raw[6], raw[7]]),
        }
    }

    pub fn value_high(&self) -> u8 {
        (self.value >> 8) as u8
    }

    pub fn value_low(&self) -> u8 {
        self.value as u8
    }
}

/// What a SETUP packet asks of the keyboard.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Request {
    /// Descriptor type and index from `wValue`.
    GetDescriptor { kind: u8, index: u8 },
    GetStatus,
    SetAddress(u8),
    GetConfiguration,
    SetConfiguration(u8),
    GetReport,
    GetIdle,
    GetProtocol,
    /// Host-to-device report with a data stage of `length` bytes; on a
    /// boot keyboard this is the LED state.
    SetReport { length: u16 },
    SetIdle(u8),
    SetProtocol(u8),
    Reboot,
    /// Answered with a STALL.
    Unsupported,
}

impl Request {
    pub fn decode(setup: &Setup) -> Self {
        match (setup.request_type, setup.request) {
            (0x80 | 0x81, GET_DESCRIPTOR) => Request::GetDescriptor {
                kind: setup.value_high(),
                index: setup.value_low(),
            },
            (0x80..=0x82, GET_STATUS) => Request::GetStatus,
            (0x00, SET_ADDRESS) => Request::SetAddress(setup.value_low() & 0x7F),
            (0x80, GET_CONFIGURATION) => Request::GetConfiguration,
            (0x00, SET_CONFIGURATION) => Request::SetConfiguration(setup.value_low()),
            (0xA1, HID_GET_REPORT) => Request::GetReport,
            (0xA1, HID_GET_IDLE) => Request::GetIdle,
            (0xA1, HID_GET_PROTOCOL) => Request::GetProtocol,
            (0x21, HID_SET_REPORT) => Request::SetReport {
                length: setup.length,
            },
            (0x21, HID_SET_IDLE) => Request::SetIdle(setup.value_high()),
            (0x21, HID_SET_PROTOCOL) => Request::SetProtocol(setup.value_low()),
            (0x40, VENDOR_REBOOT) => Request::Reboot,
            _ => Request::Unsupported,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(raw: [u8; 8]) -> Request {
        Request::decode(&Setup::from_bytes(raw))
    }

    #[test]
    fn test_setup_fields() {
        let setup = Setup::from_bytes([0x80, 0x06, 0x00, 0x22, 0x00, 0x00, 0x3F, 0x00]);
        assert_eq!(setup.value_high(), 0x22);
        assert_eq!(setup.value_low(), 0x00);
        assert_eq!(setup.length, 63);
        assert_eq!(setup.index, 0);
    }

    #[test]
    fn test_led_report_is_accepted() {
        // Caps Lock toggled: SET_REPORT, output report 0, one data byte.
        assert_eq!(
            decode([0x21, 0x09, 0x00, 0x02, 0x00, 0x00, 0x01, 0x00]),
            Request::SetReport { length: 1 }
        );
    }

    #[test]
    fn test_descriptor_declares_led_output() {
        assert!(REPORT_DESCRIPTOR.windows(2).any(|item| item == [0x91, 0x02]));
        assert_eq!(REPORT_DESCRIPTOR.last(), Some(&0xC0));
    }

    #[test]
    fn test_standard_requests() {
        assert_eq!(
            decode([0x80, 0x06, 0x02, 0x03, 0x09, 0x04, 0xFF, 0x00]),
            Request::GetDescriptor { kind: 3, index: 2 }
        );
        assert_eq!(
            decode([0x00, 0x05, 0x85, 0x00, 0, 0, 0, 0]),
            Request::SetAddress(0x05)
        );
        assert_eq!(
            decode([0x00, 0x09, 0x01, 0x00, 0, 0, 0, 0]),
            Request::SetConfiguration(1)
        );
        assert_eq!(decode([0x82, 0x00, 0, 0, 0x81, 0, 2, 0]), Request::GetStatus);
    }

    #[test]
    fn test_hid_class_requests() {
        assert_eq!(
            decode([0x21, 0x0A, 0x00, 0x7D, 0, 0, 0, 0]),
            Request::SetIdle(0x7D)
        );
        assert_eq!(
            decode([0x21, 0x0B, 0x00, 0x00, 0, 0, 0, 0]),
            Request::SetProtocol(0)
        );
        assert_eq!(decode([0xA1, 0x01, 0x00, 0x01, 0, 0, 8, 0]), Request::GetReport);
    }

    #[test]
    fn test_vendor_reboot() {
        assert_eq!(decode([0x40, 0xFF, 0, 0, 0, 0, 0, 0]), Request::Reboot);
        assert_eq!(decode([0xC0, 0xFF, 0, 0, 0, 0, 0, 0]), Request::Unsupported);
    }

    #[test]
    fn test_unknown_request_stalls() {
        // SET_DESCRIPTOR is not supported.
        assert_eq!(decode([0x00, 0x07, 0, 0, 0, 0, 0, 0]), Request::Unsupported);
    }
}
