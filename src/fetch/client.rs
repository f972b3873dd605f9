//! Fetch client: fingerprint, cache, coalesce, then hit the network.

use crate::fetch::cache::BoundedCache;
use crate::fetch::inflight::InFlightRegistry;
use crate::fetch::retry::{RetryPolicy, retry_async};
use crate::fetch::transport::Transport;
use crate::fetch::Payload;
use crate::spoonacular::endpoints::redacted;
use crate::spoonacular::json::{decode_value_with_context, parse_json_with_context};
use crate::spoonacular::request::NormalizedRequest;
use crate::spoonacular::{
    Endpoints, FetchError, Fingerprint, LogicalRequest, RandomResponse, RecipeDetails,
    SearchResponse,
};
use crate::utils::log_if_slow;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};
use url::Url;

const SLOW_REQUEST_THRESHOLD: Duration = Duration::from_secs(2);

/// Cache and in-flight registry shared by every client built from it.
///
/// Constructed once at startup; independent instances give independent caches.
#[derive(Clone)]
pub struct FetchContext {
    cache: BoundedCache,
    registry: InFlightRegistry,
}

impl FetchContext {
    pub fn new(cache: BoundedCache) -> Self {
        Self {
            cache,
            registry: InFlightRegistry::new(),
        }
    }

    pub fn cache(&self) -> &BoundedCache {
        &self.cache
    }

    pub fn registry(&self) -> &InFlightRegistry {
        &self.registry
    }
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Bound on a single network attempt.
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// Outbound request budget; 0 means unlimited.
    pub requests_per_second: u32,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            requests_per_second: 0,
        }
    }
}

#[derive(Clone)]
pub struct FetchClient {
    transport: Arc<dyn Transport>,
    endpoints: Endpoints,
    context: FetchContext,
    options: Arc<FetchOptions>,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl FetchClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        endpoints: Endpoints,
        context: FetchContext,
        options: FetchOptions,
    ) -> Self {
        let limiter = NonZeroU32::new(options.requests_per_second)
            .map(|rps| Arc::new(RateLimiter::direct(Quota::per_second(rps))));
        Self {
            transport,
            endpoints,
            context,
            options: Arc::new(options),
            limiter,
        }
    }

    pub fn context(&self) -> &FetchContext {
        &self.context
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Whether network attempts wait on an outbound rate limiter.
    pub fn is_rate_limited(&self) -> bool {
        self.limiter.is_some()
    }

    /// Resolve a logical request to its payload.
    ///
    /// Served from cache when possible; otherwise joins (or starts) the single
    /// pending network call for the request's fingerprint.
    pub async fn fetch(&self, request: &LogicalRequest) -> Result<Payload, FetchError> {
        self.fetch_checked(request, |_| Ok(())).await
    }

    /// Like [`fetch`](Self::fetch), but a payload is only cached once `check`
    /// accepts it. A cached payload that `check` rejects is dropped and fetched again.
    async fn fetch_checked(
        &self,
        request: &LogicalRequest,
        check: PayloadCheck,
    ) -> Result<Payload, FetchError> {
        let normalized = request.normalize()?;
        let key = normalized.fingerprint();

        if let Some(payload) = self.context.cache.get(&key) {
            if check(&*payload).is_ok() {
                debug!(fingerprint = %key, "cache hit");
                return Ok(payload);
            }
            debug!(fingerprint = %key, "cached payload rejected, refetching");
            self.context.cache.invalidate(&key);
        }

        let client = self.clone();
        let fingerprint = key.clone();
        self.context
            .registry
            .join(key, move || async move {
                client.load(normalized, fingerprint, check).await
            })
            .await
    }

    /// Starter for a pending request: network I/O with retries, then cache fill.
    async fn load(
        &self,
        request: NormalizedRequest,
        key: Fingerprint,
        check: PayloadCheck,
    ) -> Result<Payload, FetchError> {
        // A call that finished between our cache miss and our join may have filled it.
        if let Some(payload) = self.context.cache.get(&key)
            && check(&*payload).is_ok()
        {
            debug!(fingerprint = %key, "cache filled while joining");
            return Ok(payload);
        }

        let url = self.endpoints.url_for(&request)?;
        let shown = redacted(&url);
        let start = Instant::now();

        let payload = retry_async(&self.options.retry, &shown, |attempt| {
            self.attempt(&url, &shown, attempt)
        })
        .await?;

        // A body of the wrong shape is as unusable as malformed JSON; never cache it.
        check(&*payload).map_err(|e| FetchError::Parse {
            url: shown.clone(),
            message: e.to_string(),
        })?;

        log_if_slow(start, SLOW_REQUEST_THRESHOLD, &shown);
        self.context.cache.put(key.clone(), payload.clone());
        info!(
            fingerprint = %key,
            duration = crate::utils::fmt_duration(start.elapsed()),
            "fetched from network"
        );
        Ok(payload)
    }

    /// One network attempt, bounded by the configured timeout.
    async fn attempt(&self, url: &Url, shown: &str, attempt: u32) -> Result<Payload, FetchError> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        debug!(url = shown, attempt, "sending request");
        let response = tokio::time::timeout(self.options.timeout, self.transport.get(url))
            .await
            .map_err(|_| FetchError::Timeout(self.options.timeout))??;

        if !response.is_success() {
            return Err(FetchError::HttpStatus {
                status: response.status,
                url: shown.to_owned(),
            });
        }

        let value: serde_json::Value =
            parse_json_with_context(&response.body).map_err(|e| FetchError::Parse {
                url: shown.to_owned(),
                message: e.to_string(),
            })?;
        Ok(Arc::new(value))
    }

    /// Search recipes by free text.
    pub async fn search_recipes(
        &self,
        query: &str,
        number: u32,
        offset: u32,
    ) -> Result<SearchResponse, FetchError> {
        self.fetch_typed(&LogicalRequest::search(query, number, offset))
            .await
    }

    /// A batch of random recipes, as shown on the front page.
    pub async fn random_recipes(&self, number: u32) -> Result<RandomResponse, FetchError> {
        self.fetch_typed(&LogicalRequest::random_batch(number)).await
    }

    pub async fn recipe_details(&self, id: u64) -> Result<RecipeDetails, FetchError> {
        self.fetch_typed(&LogicalRequest::details(id)).await
    }

    async fn fetch_typed<T: DeserializeOwned>(
        &self,
        request: &LogicalRequest,
    ) -> Result<T, FetchError> {
        let payload = self.fetch_checked(request, decodes_as::<T>).await?;
        decode_value_with_context(&payload).map_err(|e| FetchError::Parse {
            url: self.shown_url(request),
            message: e.to_string(),
        })
    }

    /// The request's URL with the credential masked, for error messages.
    fn shown_url(&self, request: &LogicalRequest) -> String {
        request
            .normalize()
            .and_then(|normalized| self.endpoints.url_for(&normalized))
            .map(|url| redacted(&url))
            .unwrap_or_else(|_| request.operation().to_string())
    }
}

/// Accepts or rejects a payload before it is cached.
type PayloadCheck = fn(&serde_json::Value) -> anyhow::Result<()>;

fn decodes_as<T: DeserializeOwned>(value: &serde_json::Value) -> anyhow::Result<()> {
    decode_value_with_context::<T>(value).map(|_| ())
}
