//! Run the firmware's scan cycle against a simulated matrix.

use anyhow::{bail, Context, Result};
use atreus_core::{KeyMatrix, Keyboard, KeyboardReport, Modifiers, ReportSink, State, COLS, ROWS};

/// A matrix whose switches are fixed for the whole simulation.
pub struct SimMatrix {
    pressed: [[bool; COLS]; ROWS],
    function: bool,
    active_row: Option<usize>,
}

impl SimMatrix {
    pub fn new(presses: &[(usize, usize)], function: bool) -> Result<Self> {
        let mut pressed = [[false; COLS]; ROWS];
        for &(row, col) in presses {
            check_coord(row, col)?;
            pressed[row][col] = true;
        }
        Ok(Self {
            pressed,
            function,
            active_row: None,
        })
    }
}

impl KeyMatrix for SimMatrix {
    fn activate_row(&mut self, row: usize) {
        self.active_row = Some(row);
    }

    fn read_columns(&mut self) -> u16 {
        let Some(row) = self.active_row else {
            return u16::MAX;
        };
        self.pressed[row]
            .iter()
            .enumerate()
            .filter(|(_, down)| **down)
            .fold(u16::MAX, |levels, (col, _)| levels & !(1 << col))
    }

    fn function_line(&mut self) -> bool {
        self.function
    }

    fn settle(&mut self) {}
}

#[derive(Default)]
struct Capture(Option<KeyboardReport>);

impl ReportSink for Capture {
    fn send(&mut self, report: &KeyboardReport) {
        self.0 = Some(*report);
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Report(KeyboardReport),
    Reflash,
}

/// Parse a `ROW,COL` matrix coordinate.
pub fn parse_coord(s: &str) -> Result<(usize, usize)> {
    let (row, col) = s
        .split_once(',')
        .with_context(|| format!("expected ROW,COL, got {:?}", s))?;
    let row: usize = row.trim().parse().with_context(|| format!("bad row in {:?}", s))?;
    let col: usize = col.trim().parse().with_context(|| format!("bad column in {:?}", s))?;
    check_coord(row, col)?;
    Ok((row, col))
}

fn check_coord(row: usize, col: usize) -> Result<()> {
    if row >= ROWS || col >= COLS {
        bail!("{},{} is outside the {}x{} matrix", row, col, ROWS, COLS);
    }
    Ok(())
}

/// Run one cycle with the given switches closed.
pub fn run(presses: &[(usize, usize)], function: bool) -> Result<Outcome> {
    let mut keyboard = Keyboard::new(SimMatrix::new(presses, function)?);
    let mut sink = Capture::default();
    match (keyboard.cycle(&mut sink), sink.0) {
        (State::Reflash, _) => Ok(Outcome::Reflash),
        (State::Scanning, Some(report)) => Ok(Outcome::Report(report)),
        (State::Scanning, None) => bail!("cycle finished without sending a report"),
    }
}

/// Human-readable report dump.
pub fn format_report(report: &KeyboardReport) -> String {
    let mods = Modifiers::from_bits_retain(report.modifiers);
    let keys: Vec<String> = report
        .keys
        .iter()
        .filter(|&&k| k != 0)
        .map(|k| format!("0x{:02X}", k))
        .collect();
    format!(
        "modifiers: 0x{:02X} {:?}\nkeys:      [{}]\nbytes:     {:02X?}",
        report.modifiers,
        mods,
        keys.join(", "),
        report.to_bytes()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coord() {
        assert_eq!(parse_coord("0,1").unwrap(), (0, 1));
        assert_eq!(parse_coord(" 3 , 10 ").unwrap(), (3, 10));
        assert!(parse_coord("4,0").is_err());
        assert!(parse_coord("0,11").is_err());
        assert!(parse_coord("01").is_err());
        assert!(parse_coord("a,b").is_err());
    }

    #[test]
    fn test_run_plain_key() {
        let outcome = run(&[(0, 1)], false).unwrap();
        let Outcome::Report(report) = outcome else {
            panic!("expected a report, got {:?}", outcome);
        };
        assert_eq!(report.modifiers, 0);
        assert_eq!(report.keys, [26, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_run_fn_layer() {
        let outcome = run(&[(2, 7)], true).unwrap();
        assert_eq!(
            outcome,
            Outcome::Report(KeyboardReport {
                modifiers: 0,
                reserved: 0,
                keys: [30, 0, 0, 0, 0, 0],
            })
        );
    }

    #[test]
    fn test_run_rejects_out_of_range_press() {
        let err = run(&[(0, 1), (ROWS, 0)], false).unwrap_err();
        assert!(err.to_string().contains("outside"));
        assert!(run(&[(0, COLS)], false).is_err());
    }

    #[test]
    fn test_run_reflash() {
        assert_eq!(run(&[(3, 0)], true).unwrap(), Outcome::Reflash);
    }

    #[test]
    fn test_format_report() {
        let report = KeyboardReport {
            modifiers: 0x02,
            reserved: 0,
            keys: [0x1E, 0, 0, 0, 0, 0],
        };
        let text = format_report(&report);
        assert!(text.contains("modifiers: 0x02"));
        assert!(text.contains("[0x1E]"));
    }
}
