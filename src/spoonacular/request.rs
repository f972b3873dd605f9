//! Logical requests and their fingerprints.
//!
//! A [`LogicalRequest`] names an operation and its parameters in whatever
//! order the caller supplied them. Normalization applies endpoint defaults,
//! canonicalizes numbers and free text, and sorts parameters by key, so two
//! requests that would hit the same endpoint with the same effective query
//! produce the same [`Fingerprint`].

use crate::spoonacular::errors::FetchError;
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use unicode_normalization::UnicodeNormalization;

/// Batch size used by the front page and by searches when none is given.
pub const DEFAULT_BATCH_SIZE: u32 = 12;

/// Parameters whose values are numbers and get a canonical rendering.
const NUMERIC_PARAMS: &[&str] = &["number", "offset", "id"];

/// Free-text parameters that are matched case-insensitively by the API.
const TEXT_PARAMS: &[&str] = &["query"];

/// Parameter name of the credential; always injected by the client.
pub(crate) const API_KEY_PARAM: &str = "apiKey";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Search,
    RandomBatch,
    Details,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Search => "search",
            Operation::RandomBatch => "random",
            Operation::Details => "details",
        }
    }

    /// Parameters filled in when the caller leaves them out.
    fn defaults(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Operation::Search => &[("query", ""), ("number", "12"), ("offset", "0")],
            Operation::RandomBatch => &[("number", "12")],
            Operation::Details => &[],
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "search" => Ok(Operation::Search),
            "random" | "random_batch" | "randombatch" => Ok(Operation::RandomBatch),
            "details" => Ok(Operation::Details),
            other => Err(FetchError::InvalidRequest(format!(
                "unknown operation '{other}'"
            ))),
        }
    }
}

/// A request as issued by a caller, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalRequest {
    operation: Operation,
    parameters: IndexMap<String, String>,
}

impl LogicalRequest {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            parameters: IndexMap::new(),
        }
    }

    /// Add or replace a parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.parameters.insert(key.into(), value.to_string());
        self
    }

    pub fn search(query: &str, number: u32, offset: u32) -> Self {
        Self::new(Operation::Search)
            .with_param("query", query)
            .with_param("number", number)
            .with_param("offset", offset)
    }

    pub fn random_batch(number: u32) -> Self {
        Self::new(Operation::RandomBatch).with_param("number", number)
    }

    pub fn details(id: u64) -> Self {
        Self::new(Operation::Details).with_param("id", id)
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn parameters(&self) -> &IndexMap<String, String> {
        &self.parameters
    }

    /// Apply defaults and canonicalize every parameter.
    pub fn normalize(&self) -> Result<NormalizedRequest, FetchError> {
        let mut params = BTreeMap::new();

        for (key, value) in &self.parameters {
            if key.is_empty() {
                return Err(FetchError::InvalidRequest("empty parameter name".into()));
            }
            if key == API_KEY_PARAM {
                return Err(FetchError::InvalidRequest(format!(
                    "'{API_KEY_PARAM}' is supplied by the client configuration"
                )));
            }
            params.insert(key.clone(), canonical_value(key, value)?);
        }

        for (key, value) in self.operation.defaults() {
            if !params.contains_key(*key) {
                params.insert((*key).to_owned(), (*value).to_owned());
            }
        }

        if self.operation == Operation::Details {
            let id = params
                .get("id")
                .ok_or_else(|| FetchError::InvalidRequest("details request without an id".into()))?;
            if !id.bytes().all(|b| b.is_ascii_digit()) {
                return Err(FetchError::InvalidRequest(format!(
                    "recipe id must be a non-negative integer, got '{id}'"
                )));
            }
        }

        Ok(NormalizedRequest {
            operation: self.operation,
            params,
        })
    }
}

/// A request with defaults applied and parameters in canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRequest {
    operation: Operation,
    params: BTreeMap<String, String>,
}

impl NormalizedRequest {
    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Parameters sorted by key.
    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn fingerprint(&self) -> Fingerprint {
        // form-urlencoding escapes '&' and '=', so distinct values never collide.
        let mut encoded = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.params {
            encoded.append_pair(key, value);
        }
        Fingerprint(format!("{}?{}", self.operation.as_str(), encoded.finish()))
    }
}

/// Deterministic cache and coalescing key of a logical request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprint a logical request, failing fast on malformed input.
pub fn fingerprint(request: &LogicalRequest) -> Result<Fingerprint, FetchError> {
    Ok(request.normalize()?.fingerprint())
}

fn canonical_value(key: &str, value: &str) -> Result<String, FetchError> {
    if NUMERIC_PARAMS.contains(&key) {
        canonical_number(value).ok_or_else(|| {
            FetchError::InvalidRequest(format!("parameter '{key}' is not a finite number: '{value}'"))
        })
    } else if TEXT_PARAMS.contains(&key) {
        Ok(canonical_text(value))
    } else {
        Ok(value.to_owned())
    }
}

/// Render a number without leading zeros or a redundant fractional part.
fn canonical_number(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Plain digit strings are handled exactly, independent of float precision.
    if trimmed.bytes().all(|b| b.is_ascii_digit()) {
        let stripped = trimmed.trim_start_matches('0');
        return Some(if stripped.is_empty() { "0" } else { stripped }.to_owned());
    }

    let parsed: f64 = trimmed.parse().ok()?;
    if !parsed.is_finite() {
        return None;
    }
    if parsed == 0.0 {
        return Some("0".to_owned());
    }
    if parsed.fract() == 0.0 && parsed.abs() < 9_007_199_254_740_992.0 {
        return Some(format!("{}", parsed as i64));
    }
    Some(format!("{parsed}"))
}

/// NFC-normalize, collapse whitespace and lower-case free text.
fn canonical_text(raw: &str) -> String {
    let composed: String = raw.nfc().collect();
    composed
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
