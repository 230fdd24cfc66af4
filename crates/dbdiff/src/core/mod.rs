//! Core abstractions for dialect-agnostic schema comparison.
//!
//! - [`schema`]: Table, column, and constraint metadata types
//! - [`traits`]: The [`SchemaExtractor`] trait each dialect implements
//! - [`extract`]: Sequential and parallel extraction drivers
//!
//! Driver modules (`drivers/postgres`, `drivers/mysql`) implement the trait;
//! everything downstream (diffing, migration notes, presentation) only sees
//! the types in [`schema`].

pub mod extract;
pub mod schema;
pub mod traits;

pub use extract::{extract_schema, extract_schema_parallel};
pub use schema::{
    CheckConstraint, Column, Facet, ForeignKey, Index, PrimaryKey, Schema, Table, Unique,
};
pub use traits::SchemaExtractor;
