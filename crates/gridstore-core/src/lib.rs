//! # gridstore-core
//!
//! Core data model for the gridstore spreadsheet storage layer.
//!
//! This crate provides the fundamental types shared by the indexed stores in
//! `gridstore-index`:
//! - [`CellRef`] and [`RangeRef`] - cell addressing and rectangular ranges
//! - [`Selection`] - a cell, a range, or a label resolving to one of those
//! - [`WatcherHub`] / [`WatcherHandle`] - synchronous change notification
//! - [`Store`] - the generic keyed-store contract with paginated export
//! - [`Error`] / [`Result`] - the shared error type
//!
//! ## Example
//!
//! ```rust
//! use gridstore_core::{CellRef, RangeRef, Selection};
//!
//! let range = RangeRef::parse("A1:B2").unwrap();
//! assert!(range.contains(&CellRef::parse("B2").unwrap()));
//!
//! // Absolute markers never affect identity.
//! assert_eq!(CellRef::parse("$A$1").unwrap(), CellRef::parse("A1").unwrap());
//!
//! let selection = Selection::range(range);
//! assert!(selection.is_concrete());
//! ```

pub mod error;
pub mod reference;
pub mod selection;
pub mod store;
pub mod watch;

// Re-exports for convenience
pub use error::{Error, Result};
pub use reference::{CellRef, RangeRef, RangeRefIterator};
pub use selection::Selection;
pub use store::{window, SaveEvent, Store};
pub use watch::{WatcherHandle, WatcherHub};

/// Maximum number of rows in a sheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a sheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;
