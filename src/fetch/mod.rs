//! Caching, coalescing fetch layer beneath the recipe page.

pub mod cache;
pub mod client;
pub mod inflight;
pub mod retry;
pub mod transport;

use std::sync::Arc;

/// A parsed response body. Shared, never mutated after it is stored.
pub type Payload = Arc<serde_json::Value>;

pub use cache::{BoundedCache, CacheStats};
pub use client::{FetchClient, FetchContext, FetchOptions};
pub use inflight::InFlightRegistry;
pub use retry::RetryPolicy;
pub use transport::{RawResponse, ReqwestTransport, Transport};
