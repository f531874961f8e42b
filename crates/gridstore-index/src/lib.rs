//! Indexed stores for the gridstore storage layer
//!
//! Three stores built on the [`gridstore_core`] primitives:
//!
//! - [`RangeIndex`]: values attached to rectangular ranges, with efficient
//!   "which ranges contain this cell" lookup
//! - [`ReferenceGraph`]: bidirectional cell → target reference edges
//! - [`LabelRegistry`]: case-insensitive named selections with recursive
//!   resolution and save-time cycle rejection
//!
//! All three implement the generic [`Store`](gridstore_core::Store) contract
//! and publish changes through [`WatcherHub`](gridstore_core::WatcherHub)s.
//!
//! ```
//! use gridstore_core::{CellRef, RangeRef};
//! use gridstore_index::RangeIndex;
//!
//! let mut index = RangeIndex::new();
//! index.add_value(&RangeRef::parse("A1:B2")?, "sum-region");
//!
//! let hits = index.find_values_with_cell(&CellRef::parse("B2")?);
//! assert_eq!(hits, vec!["sum-region"]);
//! # Ok::<(), gridstore_core::Error>(())
//! ```

pub mod label_registry;
pub mod range_index;
pub mod reference_graph;
pub mod resolver;

pub use label_registry::{LabelMapping, LabelRegistry};
pub use range_index::{RangeIndex, ValueEvent};
pub use reference_graph::{EdgeEvent, ReferenceGraph, Target};
