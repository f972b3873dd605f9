//! Spoonacular recipe API: requests, fingerprints, endpoints and records.

pub mod endpoints;
pub mod errors;
pub mod json;
pub mod models;
pub mod request;

pub use endpoints::{DEFAULT_BASE_URL, Endpoints};
pub use errors::FetchError;
pub use models::{RandomResponse, Recipe, RecipeDetails, SearchResponse};
pub use request::{DEFAULT_BATCH_SIZE, Fingerprint, LogicalRequest, Operation, fingerprint};
