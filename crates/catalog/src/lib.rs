use std::sync::Arc;

use thiserror::Error;

pub mod cache;
pub mod data_model;
pub mod proximity;
pub mod source;

pub use cache::LocationCatalog;
pub use proximity::{ProximityError, ProximityFilter};
pub use source::{CatalogSource, CsvCatalogSource};

#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("could not read '{path}': {reason}")]
    Io { path: String, reason: String },
    #[error("malformed catalog row: {0}")]
    Csv(Arc<csv::Error>),
    #[error("line {line} has a blank carpark number")]
    BlankId { line: u64 },
    #[error("line {line} has non-finite coordinates")]
    InvalidPosition { line: u64 },
}

impl From<csv::Error> for CatalogError {
    fn from(e: csv::Error) -> Self {
        CatalogError::Csv(Arc::new(e))
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
