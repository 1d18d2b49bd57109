//! Talking to the Teensy: the HalfKay bootloader and the running keyboard.

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use rusb::{Device, DeviceHandle, GlobalContext};
use std::time::Duration;

use crate::hex::Image;

/// Teensy 2.0 HalfKay bootloader USB identifiers.
const HALFKAY_VID: u16 = 0x16C0;
const HALFKAY_PID: u16 = 0x0478;

/// The Atreus firmware while it is running as a keyboard.
const KEYBOARD_VID: u16 = 0x16C0;
const KEYBOARD_PID: u16 = 0x047E;
/// Vendor request the firmware answers by jumping into the bootloader.
const REQUEST_REBOOT: u8 = 0xFF;

/// ATmega32U4 flash page size in bytes.
const PAGE_SIZE: usize = 128;

/// The bootloader occupies flash from here to the end.
const BOOTLOADER_START: u32 = 0x7E00;

/// USB control transfer timeout.
const USB_TIMEOUT: Duration = Duration::from_secs(2);

/// Delay after each page write to allow flash programming.
const PAGE_WRITE_DELAY: Duration = Duration::from_millis(5);

fn find_device(vid: u16, pid: u16) -> Result<Option<Device<GlobalContext>>> {
    let devices = rusb::devices().context("failed to enumerate USB devices")?;
    for device in devices.iter() {
        let desc = device
            .device_descriptor()
            .context("failed to read device descriptor")?;
        if desc.vendor_id() == vid && desc.product_id() == pid {
            debug!(
                "found {:04x}:{:04x} on bus {} address {}",
                vid,
                pid,
                device.bus_number(),
                device.address()
            );
            return Ok(Some(device));
        }
    }
    Ok(None)
}

/// Whether a Teensy in HalfKay bootloader mode is connected.
pub fn detect() -> Result<bool> {
    Ok(find_device(HALFKAY_VID, HALFKAY_PID)?.is_some())
}

/// Ask a running Atreus to enter its bootloader. Returns `false` when no
/// keyboard is connected.
pub fn reboot_to_bootloader() -> Result<bool> {
    let Some(device) = find_device(KEYBOARD_VID, KEYBOARD_PID)? else {
        return Ok(false);
    };
    let handle = device
        .open()
        .context("failed to open keyboard (may need root/sudo or udev rules)")?;

    // bmRequestType 0x40: host-to-device, vendor, device recipient.
    // The keyboard detaches straight away, so the transfer may not complete.
    if let Err(err) = handle.write_control(0x40, REQUEST_REBOOT, 0, 0, &[], USB_TIMEOUT) {
        debug!("reboot request ended with {}", err);
    }
    Ok(true)
}

fn open_bootloader() -> Result<DeviceHandle<GlobalContext>> {
    match find_device(HALFKAY_VID, HALFKAY_PID)? {
        Some(device) => device
            .open()
            .context("failed to open Teensy bootloader (may need root/sudo or udev rules)"),
        None => bail!(
            "Teensy bootloader not found. Press the reset button on the Teensy and try again."
        ),
    }
}

/// HalfKay page write: 2-byte little-endian address followed by one page of
/// data, padded with erased-flash bytes.
fn page_buffer(address: u32, chunk: &[u8]) -> Vec<u8> {
    let mut buf = vec![0xFFu8; 2 + PAGE_SIZE];
    buf[..2].copy_from_slice(&(address as u16).to_le_bytes());
    buf[2..2 + chunk.len()].copy_from_slice(chunk);
    buf
}

/// One HalfKay write: the page's flash address and its request buffer.
#[derive(Debug, PartialEq, Eq)]
struct Page {
    address: u32,
    buffer: Vec<u8>,
}

/// Split an image into page writes. Pages start on `PAGE_SIZE`
/// boundaries; all-0xFF pages are left out.
fn pages(image: &Image) -> Result<Vec<Page>> {
    if image.end() > BOOTLOADER_START {
        bail!(
            "firmware too large: {} bytes at offset 0x{:04X} runs into the bootloader at 0x{:04X}",
            image.data.len(),
            image.base,
            BOOTLOADER_START
        );
    }

    let image = image.aligned(PAGE_SIZE as u32);
    let mut pages = Vec::new();
    for (index, chunk) in image.data.chunks(PAGE_SIZE).enumerate() {
        let address = image.base + (index * PAGE_SIZE) as u32;
        if chunk.iter().all(|&b| b == 0xFF) {
            debug!("skipping erased page at 0x{:04X}", address);
            continue;
        }
        pages.push(Page {
            address,
            buffer: page_buffer(address, chunk),
        });
    }
    Ok(pages)
}

/// Flash a firmware image page by page, then reboot into it.
pub fn flash(image: &Image) -> Result<()> {
    let pages = pages(image)?;
    let handle = open_bootloader()?;

    let pb = ProgressBar::new(pages.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} pages")
            .context("invalid progress bar template")?
            .progress_chars("=> "),
    );
    pb.set_message("Flashing");

    for page in &pages {
        write_page(&handle, &page.buffer)
            .with_context(|| format!("failed to write page at address 0x{:04X}", page.address))?;

        std::thread::sleep(PAGE_WRITE_DELAY);
        pb.inc(1);
    }

    pb.finish_with_message("Flashed");

    reboot(&handle);
    info!("Teensy rebooted, firmware should be running");
    Ok(())
}

/// HalfKay takes pages as HID SET_REPORT (output report 0, interface 0).
fn write_page(handle: &DeviceHandle<GlobalContext>, buf: &[u8]) -> Result<()> {
    handle
        .write_control(0x21, 0x09, 0x0200, 0, buf, USB_TIMEOUT)
        .context("USB control transfer failed")?;
    Ok(())
}

/// A write to address 0xFFFF makes HalfKay start the application.
fn reboot(handle: &DeviceHandle<GlobalContext>) {
    let mut buf = vec![0u8; 2 + PAGE_SIZE];
    buf[0] = 0xFF;
    buf[1] = 0xFF;
    // The device drops off the bus immediately, so errors are expected.
    if let Err(err) = handle.write_control(0x21, 0x09, 0x0200, 0, &buf, USB_TIMEOUT) {
        debug!("reboot write ended with {}", err);
    }
}
