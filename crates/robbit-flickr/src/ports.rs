use async_trait::async_trait;
use robbit_core::models::{BoundingBox, SearchPage};

use crate::error::Result;

/// Port for a paginated photo search by bounding box
#[async_trait]
pub trait PhotoSearch: Send + Sync {
    /// Fetch one 1-based page of photos inside `bbox`, requesting `extras`
    async fn search(&self, bbox: &BoundingBox, page: u32, extras: &[String]) -> Result<SearchPage>;

    /// Number of API keys the search rotates through
    fn key_count(&self) -> usize;
}

/// Raw HTTP response as seen by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }
}

/// Port for issuing GET requests
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str, params: &[(&'static str, String)]) -> Result<TransportResponse>;
}
