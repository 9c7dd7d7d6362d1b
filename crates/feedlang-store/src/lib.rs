//! Storage layer: DuckDB access to the feed database's language columns.

mod error;
pub use error::StoreError;

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::{Article, FeedStore};
