//! Catalog error types.

/// Errors that can occur when loading or extending the facility catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The backing file could not be read or written
    #[error("catalog I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The CSV layer failed to read or write a record
    #[error("catalog CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The source is structurally unusable (e.g. a required column is missing)
    #[error("catalog data format error: {message}")]
    DataFormat { message: String },

    /// A blocking source operation panicked or was cancelled
    #[error("catalog task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
