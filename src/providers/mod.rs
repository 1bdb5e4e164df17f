//! External collaborators: geocoding and routing over HTTP.
//!
//! Both providers are consumed during session setup only. Failures here
//! degrade (empty results plus a user-visible message) and never reach the
//! tracking logic.

pub mod debounce;
pub mod geocoding;
pub mod routing;

use thiserror::Error;

pub use debounce::SearchDebouncer;
pub use geocoding::{Geocoder, SearchResult};
pub use routing::Router;

/// Failures talking to a provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Malformed(String),
}
