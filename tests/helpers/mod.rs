//! Shared fixtures: a scripted in-memory transport and client builders.

#![allow(dead_code)]

use async_trait::async_trait;
use recipe_finder::fetch::{
    BoundedCache, FetchClient, FetchContext, FetchOptions, RawResponse, RetryPolicy, Transport,
};
use recipe_finder::spoonacular::{Endpoints, FetchError};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

pub const BASE_URL: &str = "http://recipes.test/recipes";
pub const API_KEY: &str = "test-key";

#[derive(Clone)]
enum Outcome {
    Response(RawResponse),
    Error(FetchError),
    /// Never completes; only a timeout gets the caller out.
    Hang,
}

/// One scripted network exchange.
#[derive(Clone)]
pub struct Step {
    delay: Option<Duration>,
    outcome: Outcome,
}

impl Step {
    pub fn ok(body: Value) -> Self {
        Self::body(200, &body.to_string())
    }

    pub fn status(status: u16) -> Self {
        Self::body(status, r#"{"status":"failure"}"#)
    }

    pub fn body(status: u16, body: &str) -> Self {
        Self {
            delay: None,
            outcome: Outcome::Response(RawResponse {
                status,
                body: body.to_owned(),
            }),
        }
    }

    pub fn error(error: FetchError) -> Self {
        Self {
            delay: None,
            outcome: Outcome::Error(error),
        }
    }

    pub fn hang() -> Self {
        Self {
            delay: None,
            outcome: Outcome::Hang,
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Transport that plays back scripted steps and records every URL it sees.
///
/// A step registered with [`on`](Self::on) only answers URLs containing its
/// pattern; steps are otherwise consumed in order.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<Vec<(Option<String>, Step)>>,
    calls: AtomicUsize,
    urls: Mutex<Vec<Url>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(self, step: Step) -> Self {
        self.push(None, step);
        self
    }

    pub fn on(self, pattern: &str, step: Step) -> Self {
        self.push(Some(pattern.to_owned()), step);
        self
    }

    pub fn push(&self, pattern: Option<String>, step: Step) {
        self.script.lock().unwrap().push((pattern, step));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<Url> {
        self.urls.lock().unwrap().clone()
    }

    fn next_step(&self, url: &Url) -> Option<Step> {
        let mut script = self.script.lock().unwrap();
        let text = url.as_str();
        let index = script.iter().position(|(pattern, _)| match pattern {
            Some(pattern) => text.contains(pattern.as_str()),
            None => true,
        })?;
        Some(script.remove(index).1)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: &Url) -> Result<RawResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.clone());

        let Some(step) = self.next_step(url) else {
            return Err(FetchError::Network(format!("no scripted response for {url}")));
        };
        if let Some(delay) = step.delay {
            tokio::time::sleep(delay).await;
        }
        match step.outcome {
            Outcome::Response(response) => Ok(response),
            Outcome::Error(error) => Err(error),
            Outcome::Hang => std::future::pending().await,
        }
    }
}

/// Deterministic retries: no jitter, short delays.
pub fn test_options() -> FetchOptions {
    FetchOptions {
        timeout: Duration::from_secs(5),
        retry: RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            jitter: 0.0,
        },
        requests_per_second: 0,
    }
}

pub fn test_cache() -> BoundedCache {
    BoundedCache::new(Duration::from_secs(600), 128)
}

pub fn client_with(transport: &Arc<ScriptedTransport>, options: FetchOptions) -> FetchClient {
    client_with_cache(transport, test_cache(), options)
}

pub fn client_with_cache(
    transport: &Arc<ScriptedTransport>,
    cache: BoundedCache,
    options: FetchOptions,
) -> FetchClient {
    let endpoints = Endpoints::new(BASE_URL, API_KEY).unwrap();
    FetchClient::new(
        transport.clone(),
        endpoints,
        FetchContext::new(cache),
        options,
    )
}

fn recipe_json(id: u64, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "image": format!("https://img.spoonacular.com/recipes/{id}-312x231.jpg"),
        "imageType": "jpg"
    })
}

/// Body of a `/complexSearch` response.
pub fn search_body(recipes: &[(u64, &str)]) -> Value {
    json!({
        "results": recipes.iter().map(|(id, title)| recipe_json(*id, title)).collect::<Vec<_>>(),
        "offset": 0,
        "number": 12,
        "totalResults": recipes.len()
    })
}

/// Body of a `/random` response.
pub fn random_body(recipes: &[(u64, &str)]) -> Value {
    json!({
        "recipes": recipes.iter().map(|(id, title)| recipe_json(*id, title)).collect::<Vec<_>>()
    })
}
