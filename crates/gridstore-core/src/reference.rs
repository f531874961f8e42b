//! Cell and range reference types
//!
//! References use a combination of column letters (A-XFD) and row numbers
//! (1-1048576). The optional `$` prefix marks a reference absolute; the flag
//! only matters when rendering formula text. Equality, ordering and hashing
//! ignore it, and every store normalizes references to relative on entry.

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A single cell reference (e.g., "A1", "$B$2")
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellRef {
    /// Row index (0-based internally, 1-based in display)
    pub row: u32,
    /// Column index (0-based, A=0, B=1, ..., XFD=16383)
    pub col: u16,
    /// Whether the row reference is absolute ($)
    pub row_absolute: bool,
    /// Whether the column reference is absolute ($)
    pub col_absolute: bool,
}

impl CellRef {
    /// Create a new relative cell reference
    pub fn new(row: u32, col: u16) -> Self {
        Self {
            row,
            col,
            row_absolute: false,
            col_absolute: false,
        }
    }

    /// Create a new cell reference with specified absolute/relative flags
    pub fn with_absolute(row: u32, col: u16, row_absolute: bool, col_absolute: bool) -> Self {
        Self {
            row,
            col,
            row_absolute,
            col_absolute,
        }
    }

    /// Create a fully absolute cell reference ($A$1 style)
    pub fn absolute(row: u32, col: u16) -> Self {
        Self::with_absolute(row, col, true, true)
    }

    /// Drop the absolute flags.
    ///
    /// Stores keep only normalized references; the reference kind exists for
    /// formula-text rendering and is stripped at every store boundary.
    pub fn normalized(&self) -> Self {
        Self::new(self.row, self.col)
    }

    /// Parse a cell reference from A1-style notation
    ///
    /// # Examples
    /// ```
    /// use gridstore_core::CellRef;
    ///
    /// let cell = CellRef::parse("A1").unwrap();
    /// assert_eq!(cell.row, 0);
    /// assert_eq!(cell.col, 0);
    ///
    /// let cell = CellRef::parse("$B$2").unwrap();
    /// assert_eq!(cell.row, 1);
    /// assert_eq!(cell.col, 1);
    /// assert!(cell.row_absolute);
    /// assert!(cell.col_absolute);
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidAddress("empty reference".into()));
        }

        let bytes = s.as_bytes();
        let mut pos = 0;

        let col_absolute = if bytes.get(pos) == Some(&b'$') {
            pos += 1;
            true
        } else {
            false
        };

        let col_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
            pos += 1;
        }

        if pos == col_start {
            return Err(Error::InvalidAddress(format!(
                "no column letters in '{}'",
                s
            )));
        }

        let col = Self::letters_to_column(&s[col_start..pos])?;

        let row_absolute = if bytes.get(pos) == Some(&b'$') {
            pos += 1;
            true
        } else {
            false
        };

        let row_str = &s[pos..];
        if row_str.is_empty() {
            return Err(Error::InvalidAddress(format!("no row number in '{}'", s)));
        }

        let row: u32 = row_str
            .parse()
            .map_err(|_| Error::InvalidAddress(format!("invalid row number in '{}'", s)))?;

        // Rows are 1-based in notation, 0-based internally
        if row == 0 {
            return Err(Error::InvalidAddress(format!(
                "row number must be >= 1 in '{}'",
                s
            )));
        }

        let row = row - 1;

        if row >= MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
        }

        Ok(Self {
            row,
            col,
            row_absolute,
            col_absolute,
        })
    }

    /// Convert column index to letters (0 = A, 25 = Z, 26 = AA, etc.)
    pub fn column_to_letters(col: u16) -> String {
        let mut result = String::new();
        let mut n = col as u32 + 1; // 1-based for calculation

        while n > 0 {
            n -= 1;
            let c = ((n % 26) as u8 + b'A') as char;
            result.insert(0, c);
            n /= 26;
        }

        result
    }

    /// Convert column letters to index (A = 0, Z = 25, AA = 26, etc.)
    pub fn letters_to_column(letters: &str) -> Result<u16> {
        if letters.is_empty() {
            return Err(Error::InvalidAddress("empty column letters".into()));
        }
        // XFD is the widest legal column; anything longer is out of bounds
        if letters.len() > 3 {
            return Err(Error::ColumnOutOfBounds(u16::MAX, MAX_COLS - 1));
        }

        let mut col: u32 = 0;
        for c in letters.chars() {
            if !c.is_ascii_alphabetic() {
                return Err(Error::InvalidAddress(format!(
                    "invalid column letter '{}'",
                    c
                )));
            }
            col = col * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
        }

        let col = col - 1; // Convert to 0-based

        if col >= MAX_COLS as u32 {
            return Err(Error::ColumnOutOfBounds(col as u16, MAX_COLS - 1));
        }

        Ok(col as u16)
    }

    /// Format as A1-style string, including `$` markers
    pub fn to_a1_string(&self) -> String {
        let mut result = String::new();

        if self.col_absolute {
            result.push('$');
        }
        result.push_str(&Self::column_to_letters(self.col));

        if self.row_absolute {
            result.push('$');
        }
        result.push_str(&(self.row + 1).to_string());

        result
    }

    /// Create a range from this reference to another
    pub fn to(&self, other: CellRef) -> RangeRef {
        RangeRef::new(*self, other)
    }
}

// Equality, ordering and hashing ignore the absolute flags: `$A$1` and `A1`
// denote the same cell. Ordering is row-major so BTreeMap scans walk the
// sheet top-to-bottom.
impl PartialEq for CellRef {
    fn eq(&self, other: &Self) -> bool {
        self.row == other.row && self.col == other.col
    }
}

impl Eq for CellRef {}

impl Hash for CellRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.row.hash(state);
        self.col.hash(state);
    }
}

impl PartialOrd for CellRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.row.cmp(&other.row).then(self.col.cmp(&other.col))
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1_string())
    }
}

impl FromStr for CellRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A rectangular range of cells (e.g., "A1:B10")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RangeRef {
    /// Begin corner (top-left after normalization)
    pub begin: CellRef,
    /// End corner (bottom-right after normalization)
    pub end: CellRef,
}

impl RangeRef {
    /// Create a new range, normalizing so `begin` is top-left and `end` is
    /// bottom-right
    pub fn new(begin: CellRef, end: CellRef) -> Self {
        let (begin_row, end_row) = if begin.row <= end.row {
            (begin.row, end.row)
        } else {
            (end.row, begin.row)
        };

        let (begin_col, end_col) = if begin.col <= end.col {
            (begin.col, end.col)
        } else {
            (end.col, begin.col)
        };

        Self {
            begin: CellRef::with_absolute(
                begin_row,
                begin_col,
                begin.row_absolute,
                begin.col_absolute,
            ),
            end: CellRef::with_absolute(end_row, end_col, end.row_absolute, end.col_absolute),
        }
    }

    /// Create a range from row/column indices
    pub fn from_indices(begin_row: u32, begin_col: u16, end_row: u32, end_col: u16) -> Self {
        Self::new(
            CellRef::new(begin_row, begin_col),
            CellRef::new(end_row, end_col),
        )
    }

    /// Create a single-cell range
    pub fn single(cell: CellRef) -> Self {
        Self {
            begin: cell,
            end: cell,
        }
    }

    /// Parse a range from A1:B10 notation (a bare reference is a single-cell
    /// range)
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if let Some(colon_pos) = s.find(':') {
            let begin = CellRef::parse(&s[..colon_pos])?;
            let end = CellRef::parse(&s[colon_pos + 1..])?;
            Ok(Self::new(begin, end))
        } else {
            let cell = CellRef::parse(s)?;
            Ok(Self::single(cell))
        }
    }

    /// Drop the absolute flags from both corners
    pub fn normalized(&self) -> Self {
        Self {
            begin: self.begin.normalized(),
            end: self.end.normalized(),
        }
    }

    /// Check if a cell is within this range (inclusive)
    pub fn contains(&self, cell: &CellRef) -> bool {
        cell.row >= self.begin.row
            && cell.row <= self.end.row
            && cell.col >= self.begin.col
            && cell.col <= self.end.col
    }

    /// Get the number of rows in the range
    pub fn row_count(&self) -> u32 {
        self.end.row - self.begin.row + 1
    }

    /// Get the number of columns in the range
    pub fn col_count(&self) -> u16 {
        self.end.col - self.begin.col + 1
    }

    /// Get the total number of cells in the range
    pub fn cell_count(&self) -> u64 {
        self.row_count() as u64 * self.col_count() as u64
    }

    /// Check if this range overlaps with another
    pub fn overlaps(&self, other: &RangeRef) -> bool {
        self.begin.row <= other.end.row
            && self.end.row >= other.begin.row
            && self.begin.col <= other.end.col
            && self.end.col >= other.begin.col
    }

    /// Get the intersection of two ranges, if any
    pub fn intersect(&self, other: &RangeRef) -> Option<RangeRef> {
        if !self.overlaps(other) {
            return None;
        }

        Some(RangeRef::from_indices(
            self.begin.row.max(other.begin.row),
            self.begin.col.max(other.begin.col),
            self.end.row.min(other.end.row),
            self.end.col.min(other.end.col),
        ))
    }

    /// Iterate over all cell references in the range (row by row)
    pub fn cells(&self) -> RangeRefIterator {
        RangeRefIterator {
            range: *self,
            current_row: self.begin.row,
            current_col: self.begin.col,
        }
    }

    /// Format as A1:B10 string (single-cell ranges print as A1)
    pub fn to_a1_string(&self) -> String {
        if self.begin == self.end {
            self.begin.to_a1_string()
        } else {
            format!("{}:{}", self.begin.to_a1_string(), self.end.to_a1_string())
        }
    }
}

impl fmt::Display for RangeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1_string())
    }
}

impl FromStr for RangeRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Iterator over cells in a range
pub struct RangeRefIterator {
    range: RangeRef,
    current_row: u32,
    current_col: u16,
}

impl Iterator for RangeRefIterator {
    type Item = CellRef;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_row > self.range.end.row {
            return None;
        }

        let cell = CellRef::new(self.current_row, self.current_col);

        self.current_col += 1;
        if self.current_col > self.range.end.col {
            self.current_col = self.range.begin.col;
            self.current_row += 1;
        }

        Some(cell)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.current_row > self.range.end.row {
            return (0, Some(0));
        }
        let rows_below = (self.range.end.row - self.current_row) as u64;
        let in_current_row = (self.range.end.col - self.current_col + 1) as u64;
        let remaining = (rows_below * self.range.col_count() as u64 + in_current_row) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for RangeRefIterator {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_to_letters() {
        assert_eq!(CellRef::column_to_letters(0), "A");
        assert_eq!(CellRef::column_to_letters(1), "B");
        assert_eq!(CellRef::column_to_letters(25), "Z");
        assert_eq!(CellRef::column_to_letters(26), "AA");
        assert_eq!(CellRef::column_to_letters(27), "AB");
        assert_eq!(CellRef::column_to_letters(701), "ZZ");
        assert_eq!(CellRef::column_to_letters(702), "AAA");
        assert_eq!(CellRef::column_to_letters(16383), "XFD"); // Max column
    }

    #[test]
    fn test_letters_to_column() {
        assert_eq!(CellRef::letters_to_column("A").unwrap(), 0);
        assert_eq!(CellRef::letters_to_column("Z").unwrap(), 25);
        assert_eq!(CellRef::letters_to_column("AA").unwrap(), 26);
        assert_eq!(CellRef::letters_to_column("XFD").unwrap(), 16383);

        // Case insensitive
        assert_eq!(CellRef::letters_to_column("a").unwrap(), 0);
        assert_eq!(CellRef::letters_to_column("aa").unwrap(), 26);
    }

    #[test]
    fn test_parse() {
        let cell = CellRef::parse("A1").unwrap();
        assert_eq!(cell.row, 0);
        assert_eq!(cell.col, 0);
        assert!(!cell.row_absolute);
        assert!(!cell.col_absolute);

        let cell = CellRef::parse("$A$1").unwrap();
        assert!(cell.row_absolute);
        assert!(cell.col_absolute);

        let cell = CellRef::parse("$A1").unwrap();
        assert!(cell.col_absolute);
        assert!(!cell.row_absolute);

        let cell = CellRef::parse("XFD1048576").unwrap();
        assert_eq!(cell.row, 1048575);
        assert_eq!(cell.col, 16383);
    }

    #[test]
    fn test_parse_errors() {
        assert!(CellRef::parse("").is_err());
        assert!(CellRef::parse("A").is_err());
        assert!(CellRef::parse("1").is_err());
        assert!(CellRef::parse("A0").is_err()); // Row 0 is invalid
        assert!(CellRef::parse("A1048577").is_err()); // Row too large
        assert!(CellRef::parse("XFE1").is_err()); // Column too large
    }

    #[test]
    fn test_display() {
        assert_eq!(CellRef::new(0, 0).to_string(), "A1");
        assert_eq!(CellRef::new(99, 2).to_string(), "C100");
        assert_eq!(CellRef::absolute(0, 0).to_string(), "$A$1");
    }

    #[test]
    fn test_equality_ignores_reference_kind() {
        let relative = CellRef::new(4, 3);
        let absolute = CellRef::absolute(4, 3);

        assert_eq!(relative, absolute);
        assert_eq!(relative.cmp(&absolute), std::cmp::Ordering::Equal);

        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(relative);
        set.insert(absolute);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_ordering_row_major() {
        let a1 = CellRef::parse("A1").unwrap();
        let b1 = CellRef::parse("B1").unwrap();
        let a2 = CellRef::parse("A2").unwrap();

        assert!(a1 < b1);
        assert!(b1 < a2);
    }

    #[test]
    fn test_normalized() {
        let cell = CellRef::absolute(2, 5);
        let norm = cell.normalized();
        assert!(!norm.row_absolute);
        assert!(!norm.col_absolute);
        assert_eq!(norm, cell);
    }

    #[test]
    fn test_range_parse() {
        let range = RangeRef::parse("A1:B2").unwrap();
        assert_eq!(range.begin, CellRef::new(0, 0));
        assert_eq!(range.end, CellRef::new(1, 1));

        // Single cell
        let range = RangeRef::parse("C3").unwrap();
        assert_eq!(range.begin, CellRef::new(2, 2));
        assert_eq!(range.end, CellRef::new(2, 2));
    }

    #[test]
    fn test_range_corner_normalization() {
        // Corners supplied in reverse order are swapped
        let range = RangeRef::new(CellRef::new(3, 3), CellRef::new(1, 1));
        assert_eq!(range.begin, CellRef::new(1, 1));
        assert_eq!(range.end, CellRef::new(3, 3));

        // Mixed corners (bottom-left and top-right)
        let range = RangeRef::new(CellRef::new(3, 1), CellRef::new(1, 3));
        assert_eq!(range.begin, CellRef::new(1, 1));
        assert_eq!(range.end, CellRef::new(3, 3));
    }

    #[test]
    fn test_range_contains() {
        let range = RangeRef::parse("B2:D4").unwrap();

        assert!(range.contains(&CellRef::new(1, 1))); // B2
        assert!(range.contains(&CellRef::new(3, 3))); // D4
        assert!(range.contains(&CellRef::new(2, 2))); // C3

        assert!(!range.contains(&CellRef::new(0, 0))); // A1
        assert!(!range.contains(&CellRef::new(4, 1))); // B5
    }

    #[test]
    fn test_range_overlaps_and_intersect() {
        let a = RangeRef::parse("A1:C3").unwrap();
        let b = RangeRef::parse("B2:D4").unwrap();
        let c = RangeRef::parse("E5:F6").unwrap();

        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));

        let isect = a.intersect(&b).unwrap();
        assert_eq!(isect, RangeRef::parse("B2:C3").unwrap());
        assert!(a.intersect(&c).is_none());
    }

    #[test]
    fn test_range_iterator() {
        let range = RangeRef::parse("A1:B2").unwrap();
        let cells: Vec<_> = range.cells().collect();

        assert_eq!(cells.len(), 4);
        assert_eq!(cells[0], CellRef::new(0, 0)); // A1
        assert_eq!(cells[1], CellRef::new(0, 1)); // B1
        assert_eq!(cells[2], CellRef::new(1, 0)); // A2
        assert_eq!(cells[3], CellRef::new(1, 1)); // B2
    }

    #[test]
    fn test_range_iterator_size_hint_tracks_progress() {
        let range = RangeRef::parse("A1:B2").unwrap();
        let mut cells = range.cells();

        assert_eq!(cells.size_hint(), (4, Some(4)));
        cells.next();
        assert_eq!(cells.size_hint(), (3, Some(3)));
        cells.next();
        assert_eq!(cells.len(), 2);
        cells.next();
        cells.next();
        assert_eq!(cells.size_hint(), (0, Some(0)));
        assert!(cells.next().is_none());
        assert_eq!(cells.size_hint(), (0, Some(0)));
    }

    #[test]
    fn test_range_display() {
        assert_eq!(RangeRef::parse("A1:B2").unwrap().to_string(), "A1:B2");
        assert_eq!(RangeRef::parse("C3").unwrap().to_string(), "C3");
    }
}
