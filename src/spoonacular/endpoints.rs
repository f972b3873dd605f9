//! URL construction for the three recipe endpoints.

use crate::spoonacular::errors::FetchError;
use crate::spoonacular::request::{API_KEY_PARAM, NormalizedRequest, Operation};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.spoonacular.com/recipes";

const SEARCH_FLAGS: &[(&str, &str)] = &[("addRecipeInformation", "true"), ("fillIngredients", "true")];
const DETAILS_FLAGS: &[(&str, &str)] = &[("includeNutrition", "true")];

/// Base URL and credential shared by every request.
#[derive(Clone)]
pub struct Endpoints {
    base_url: Url,
    api_key: String,
}

impl std::fmt::Debug for Endpoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoints")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl Endpoints {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, FetchError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| FetchError::InvalidRequest(format!("invalid base URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(FetchError::InvalidRequest(format!(
                "base URL '{base_url}' cannot carry a path"
            )));
        }
        // Keep a trailing slash so joined segments append rather than replace.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            base_url,
            api_key: api_key.into(),
        })
    }

    /// Build the full request URL, credential included.
    pub fn url_for(&self, request: &NormalizedRequest) -> Result<Url, FetchError> {
        let (path, extra): (String, &[(&str, &str)]) = match request.operation() {
            Operation::Search => ("complexSearch".to_owned(), SEARCH_FLAGS),
            Operation::RandomBatch => ("random".to_owned(), &[]),
            Operation::Details => {
                let id = request
                    .param("id")
                    .ok_or_else(|| FetchError::InvalidRequest("details request without an id".into()))?;
                (format!("{id}/information"), DETAILS_FLAGS)
            }
        };

        let mut url = self
            .base_url
            .join(&path)
            .map_err(|e| FetchError::InvalidRequest(format!("cannot build URL for '{path}': {e}")))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair(API_KEY_PARAM, &self.api_key);
            for (key, value) in request.params() {
                // The id lives in the path for details lookups.
                if request.operation() == Operation::Details && key == "id" {
                    continue;
                }
                query.append_pair(key, value);
            }
            for (key, value) in extra {
                if request.param(key).is_none() {
                    query.append_pair(key, value);
                }
            }
        }

        Ok(url)
    }
}

/// Render a URL for logs and error messages with the credential masked.
pub fn redacted(url: &Url) -> String {
    if !url.query_pairs().any(|(k, _)| k == API_KEY_PARAM) {
        return url.to_string();
    }
    let mut masked = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let value = if k == API_KEY_PARAM {
                "***".to_owned()
            } else {
                v.into_owned()
            };
            (k.into_owned(), value)
        })
        .collect();
    masked.query_pairs_mut().clear().extend_pairs(pairs);
    masked.to_string()
}
