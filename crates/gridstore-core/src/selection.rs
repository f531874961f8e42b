//! Selections: the values labels and stores traffic in
//!
//! A selection is a single cell, a rectangular range, or a label that
//! (transitively) resolves to one of those. Labels compare case-insensitively
//! through [`Selection::canonical`], matching registry lookup rules.

use crate::reference::{CellRef, RangeRef};
use std::fmt;

/// A cell, a range, or a label naming one of those
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Selection {
    /// A single cell reference
    Cell(CellRef),
    /// A rectangular cell range
    Range(RangeRef),
    /// A label requiring recursive resolution
    Label(String),
}

impl Selection {
    /// Selection for a single cell
    pub fn cell(cell: CellRef) -> Self {
        Selection::Cell(cell)
    }

    /// Selection for a range
    pub fn range(range: RangeRef) -> Self {
        Selection::Range(range)
    }

    /// Selection naming a label
    pub fn label(name: impl Into<String>) -> Self {
        Selection::Label(name.into())
    }

    /// True for `Cell` and `Range` selections; labels require resolution
    pub fn is_concrete(&self) -> bool {
        !matches!(self, Selection::Label(_))
    }

    /// The rectangular footprint of a concrete selection.
    ///
    /// `None` for labels, which have no footprint until resolved.
    pub fn footprint(&self) -> Option<RangeRef> {
        match self {
            Selection::Cell(cell) => Some(RangeRef::single(cell.normalized())),
            Selection::Range(range) => Some(range.normalized()),
            Selection::Label(_) => None,
        }
    }

    /// Whether two concrete selections share at least one cell.
    ///
    /// Always false when either side is an unresolved label.
    pub fn intersects(&self, other: &Selection) -> bool {
        match (self.footprint(), other.footprint()) {
            (Some(a), Some(b)) => a.overlaps(&b),
            _ => false,
        }
    }

    /// Canonical form used as a visited-set key during resolution walks:
    /// references normalized to relative, label names lowercased.
    pub fn canonical(&self) -> Selection {
        match self {
            Selection::Cell(cell) => Selection::Cell(cell.normalized()),
            Selection::Range(range) => Selection::Range(range.normalized()),
            Selection::Label(name) => Selection::Label(name.to_lowercase()),
        }
    }
}

impl From<CellRef> for Selection {
    fn from(cell: CellRef) -> Self {
        Selection::Cell(cell)
    }
}

impl From<RangeRef> for Selection {
    fn from(range: RangeRef) -> Self {
        Selection::Range(range)
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Cell(cell) => write!(f, "{}", cell),
            Selection::Range(range) => write!(f, "{}", range),
            Selection::Label(name) => write!(f, "{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_footprint() {
        let cell = Selection::cell(CellRef::parse("B2").unwrap());
        assert_eq!(cell.footprint(), Some(RangeRef::parse("B2").unwrap()));

        let range = Selection::range(RangeRef::parse("A1:C3").unwrap());
        assert_eq!(range.footprint(), Some(RangeRef::parse("A1:C3").unwrap()));

        assert_eq!(Selection::label("Total").footprint(), None);
    }

    #[test]
    fn test_intersects() {
        let a = Selection::range(RangeRef::parse("A1:C3").unwrap());
        let b = Selection::cell(CellRef::parse("B2").unwrap());
        let c = Selection::cell(CellRef::parse("D4").unwrap());

        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));

        // Labels never intersect until resolved
        assert!(!a.intersects(&Selection::label("Total")));
    }

    #[test]
    fn test_canonical_lowercases_labels() {
        assert_eq!(
            Selection::label("ToTaL").canonical(),
            Selection::label("total")
        );
    }

    #[test]
    fn test_canonical_normalizes_references() {
        let abs = Selection::cell(CellRef::absolute(0, 0));
        match abs.canonical() {
            Selection::Cell(cell) => {
                assert!(!cell.row_absolute);
                assert!(!cell.col_absolute);
            }
            other => panic!("unexpected canonical form: {:?}", other),
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Selection::cell(CellRef::parse("Z9").unwrap()).to_string(),
            "Z9"
        );
        assert_eq!(Selection::label("Total").to_string(), "Total");
    }
}
