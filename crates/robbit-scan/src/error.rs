use robbit_core::RobbitError;
use robbit_flickr::FlickrError;
use robbit_store::StoreError;
use thiserror::Error;

/// Scan error types
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("No area with the name \"{0}\" exists")]
    UnknownArea(String),

    #[error(transparent)]
    Config(#[from] RobbitError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Search(#[from] FlickrError),
}

pub type Result<T> = std::result::Result<T, ScanError>;
