//! PostgreSQL driver.
//!
//! - [`PostgresExtractor`]: schema extractor over a deadpool-postgres pool

mod extractor;

pub use extractor::PostgresExtractor;
