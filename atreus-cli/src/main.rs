mod halfkay;
mod hex;
mod layout;
mod simulate;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, info, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "atreus-cli")]
#[command(about = "Atreus keyboard firmware flasher and layout tools")]
struct Cli {
    /// More logging (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Flash a .hex firmware file to Teensy via HalfKay bootloader
    Flash {
        /// Path to the Intel HEX firmware file
        firmware: PathBuf,
    },
    /// Detect if a Teensy is connected in bootloader mode
    Detect,
    /// Render both layers as an HTML page
    Layout {
        /// Output HTML file
        #[arg(short, long, default_value = "atreus-layout.html")]
        output: PathBuf,
    },
    /// Run one scan cycle with the given keys held and print the report
    Simulate {
        /// Closed switch as ROW,COL (repeatable)
        #[arg(long = "press", value_parser = simulate::parse_coord)]
        presses: Vec<(usize, usize)>,
        /// Hold the fn key
        #[arg(long = "fn")]
        function: bool,
    },
    /// Explain what a raw layout value does
    Decode {
        /// Raw value, 0-255
        value: u8,
    },
}

fn init_logging(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .context("failed to initialise logging")
}

/// Make sure HalfKay is on the bus, rebooting a running keyboard if needed.
fn wait_for_bootloader() -> Result<()> {
    if halfkay::detect()? {
        return Ok(());
    }
    if !halfkay::reboot_to_bootloader()? {
        bail!(
            "Teensy bootloader not detected and keyboard not found. \
             Press the reset button on the Teensy and try again."
        );
    }
    info!("Rebooting keyboard into bootloader...");
    for _ in 0..50 {
        std::thread::sleep(Duration::from_millis(100));
        if halfkay::detect()? {
            return Ok(());
        }
    }
    bail!(
        "Teensy bootloader not detected after reboot. \
         Press the reset button on the Teensy and try again."
    )
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    match cli.command {
        Command::Flash { firmware } => {
            let contents = fs::read_to_string(&firmware)
                .with_context(|| format!("reading {}", firmware.display()))?;
            let image = hex::load(&contents)?;

            println!(
                "Firmware: {} bytes at base address 0x{:04X}",
                image.data.len(),
                image.base
            );

            wait_for_bootloader()?;
            halfkay::flash(&image)?;
        }
        Command::Detect => {
            if halfkay::detect()? {
                println!("Teensy bootloader detected (HalfKay mode).");
            } else {
                println!("Teensy bootloader not detected.");
                println!("Press the reset button on the Teensy to enter bootloader mode.");
            }
        }
        Command::Layout { output } => {
            fs::write(&output, layout::generate_html())
                .with_context(|| format!("writing {}", output.display()))?;
            println!("Layout written to {}", output.display());
        }
        Command::Simulate { presses, function } => {
            debug!("simulating {:?} with fn {}", presses, function);
            match simulate::run(&presses, function)? {
                simulate::Outcome::Report(report) => {
                    println!("{}", simulate::format_report(&report))
                }
                simulate::Outcome::Reflash => {
                    println!("reflash: the keyboard would jump to its bootloader")
                }
            }
        }
        Command::Decode { value } => {
            println!("{}", layout::describe(value));
        }
    }

    Ok(())
}
