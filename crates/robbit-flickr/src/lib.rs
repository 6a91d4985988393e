//! Robbit Flickr - Rate-limited photo search client
//!
//! A [`FlickrClient`] draws one token per request from a [`KeyPool`] so that each
//! API key is used at most once per rate-limit interval, retries server-side
//! failures with a fixed backoff and decodes result pages into
//! [`robbit_core::models::SearchPage`].

pub mod client;
pub mod error;
pub mod keys;
pub mod ports;
pub mod response;
pub mod transport;

pub use client::FlickrClient;
pub use error::{FlickrError, Result};
pub use keys::KeyPool;
pub use ports::{PhotoSearch, Transport, TransportResponse};
pub use transport::ReqwestTransport;
