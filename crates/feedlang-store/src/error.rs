use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("table not found: {0}")]
    MissingTable(&'static str),

    #[error("column {column} has unexpected type {data_type}")]
    ColumnType {
        column: &'static str,
        data_type: String,
    },

    #[cfg(feature = "duckdb")]
    #[error("duckdb error: {0}")]
    DuckDb(#[from] ::duckdb::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}
