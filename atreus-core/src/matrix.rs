//! Key matrix scanning.
//!
//! Rows are one-hot active-low outputs and columns are active-low inputs
//! with pull-ups, so a pressed switch reads as a low column while its row
//! is driven. [`KeyMatrix`] hides how the pins map onto ports; the scanner
//! only ever sees a normalized bit-vector of column levels.

use crate::COLS;

/// Bits of a column read that correspond to physical columns.
pub const COLUMN_MASK: u16 = (1 << COLS) - 1;

/// Hardware capability the scanner runs against.
pub trait KeyMatrix {
    /// Drive `row` to the selecting (low) state and every other row high.
    fn activate_row(&mut self, row: usize);

    /// Sample every column input at once. Bit `n` is the electrical level of
    /// column `n` (`1` = high = released). Bits at or above [`COLS`] are
    /// ignored.
    fn read_columns(&mut self) -> u16;

    /// Whether the dedicated function-layer line is asserted.
    fn function_line(&mut self) -> bool;

    /// Wait for a freshly activated row to settle before sampling.
    fn settle(&mut self);
}

/// Set of pressed columns within one row.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct ColumnSet(u16);

impl ColumnSet {
    /// Convert raw active-low levels into pressed columns.
    pub const fn from_levels(levels: u16) -> Self {
        Self(!levels & COLUMN_MASK)
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Pressed column indices in ascending order.
    pub fn iter(self) -> Columns {
        Columns(self.0)
    }
}

impl IntoIterator for ColumnSet {
    type Item = usize;
    type IntoIter = Columns;

    fn into_iter(self) -> Columns {
        self.iter()
    }
}

/// Iterator over the columns of a [`ColumnSet`].
pub struct Columns(u16);

impl Iterator for Columns {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.0 == 0 {
            return None;
        }
        let col = self.0.trailing_zeros() as usize;
        self.0 &= self.0 - 1;
        Some(col)
    }
}

/// Activate `row`, let it settle, and return the columns pressed on it.
pub fn scan_row<M: KeyMatrix>(matrix: &mut M, row: usize) -> ColumnSet {
    matrix.activate_row(row);
    matrix.settle();
    ColumnSet::from_levels(matrix.read_columns())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ROWS;

    /// In-memory matrix. `pressed[row][col]` closes a switch; `fn_schedule`
    /// lets a test change the function line between reads.
    pub struct FakeMatrix {
        pub pressed: [[bool; COLS]; ROWS],
        pub fn_schedule: Vec<bool>,
        pub fn_reads: usize,
        pub active_row: Option<usize>,
        pub activations: Vec<usize>,
        pub settles: usize,
        pub unused_bits: u16,
    }

    impl FakeMatrix {
        pub fn new() -> Self {
            Self {
                pressed: [[false; COLS]; ROWS],
                fn_schedule: Vec::new(),
                fn_reads: 0,
                active_row: None,
                activations: Vec::new(),
                settles: 0,
                unused_bits: 0,
            }
        }

        pub fn press(mut self, row: usize, col: usize) -> Self {
            self.pressed[row][col] = true;
            self
        }

        pub fn with_fn(mut self, held: bool) -> Self {
            self.fn_schedule = vec![held];
            self
        }
    }

    impl KeyMatrix for FakeMatrix {
        fn activate_row(&mut self, row: usize) {
            self.active_row = Some(row);
            self.activations.push(row);
        }

        fn read_columns(&mut self) -> u16 {
            // Start from all lines high (pull-ups), including unused bits.
            let mut levels = COLUMN_MASK | self.unused_bits;
            if let Some(row) = self.active_row {
                for col in 0..COLS {
                    if self.pressed[row][col] {
                        levels &= !(1 << col);
                    }
                }
            }
            levels
        }

        fn function_line(&mut self) -> bool {
            let held = self
                .fn_schedule
                .get(self.fn_reads)
                .or(self.fn_schedule.last())
                .copied()
                .unwrap_or(false);
            self.fn_reads += 1;
            held
        }

        fn settle(&mut self) {
            self.settles += 1;
        }
    }

    #[test]
    fn test_from_levels_inverts_and_masks() {
        // Every line high: nothing pressed, including reserved upper bits.
        assert!(ColumnSet::from_levels(0xFFFF).is_empty());
        // Column 0 and 10 low.
        let set = ColumnSet::from_levels(0xFFFF & !(1 | 1 << 10));
        assert_eq!(set.iter().collect::<Vec<_>>(), [0, 10]);
        // Low reserved bits are not columns.
        let set = ColumnSet::from_levels(COLUMN_MASK);
        assert!(set.is_empty());
    }

    #[test]
    fn test_iter_ascending() {
        let set = ColumnSet::from_levels(!0b101_0010_0000);
        assert_eq!(set.iter().collect::<Vec<_>>(), [5, 8, 10]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_scan_row_drives_only_that_row() {
        let mut matrix = FakeMatrix::new().press(1, 3).press(2, 4);
        let set = scan_row(&mut matrix, 1);
        assert_eq!(set.iter().collect::<Vec<_>>(), [3]);
        assert_eq!(matrix.activations, [1]);
        assert_eq!(matrix.settles, 1);
    }

    #[test]
    fn test_scan_ignores_unused_register_bits() {
        let mut matrix = FakeMatrix::new().press(0, 10);
        matrix.unused_bits = 0;
        let set = scan_row(&mut matrix, 0);
        assert_eq!(set.iter().collect::<Vec<_>>(), [10]);
    }
}
