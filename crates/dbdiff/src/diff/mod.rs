//! Schema diff engine.
//!
//! [`compute_diff`] takes two [`Schema`](crate::core::Schema) snapshots and a
//! [`FilterConfig`] and returns a [`SchemaDiff`]. Tables are compared across
//! six facets: columns, primary key, foreign keys, unique constraints,
//! indexes and check constraints.

mod compare;
mod filter;
mod types;

pub use compare::{compare_maps, compare_table, compute_diff, format_list};
pub use filter::{parse_column_list, FilterConfig};
pub use types::{ColumnDiff, ConstraintDiff, FacetDiff, FacetView, SchemaDiff, TableDiff};
