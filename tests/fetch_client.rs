//! End-to-end behavior of the fetch client against a scripted transport.

mod helpers;

use helpers::{
    ScriptedTransport, Step, client_with, client_with_cache, random_body, search_body,
    test_options,
};
use recipe_finder::fetch::{BoundedCache, RetryPolicy};
use recipe_finder::spoonacular::{FetchError, LogicalRequest, Operation};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn concurrent_identical_searches_share_one_network_call() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .then(Step::ok(search_body(&[(1, "Pasta Carbonara")])).after(Duration::from_millis(50))),
    );
    let client = client_with(&transport, test_options());

    let request = LogicalRequest::search("pasta", 12, 0);
    let (a, b) = tokio::join!(client.fetch(&request), client.fetch(&request));

    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(transport.calls(), 1);
    assert!(client.context().registry().is_empty());
}

#[tokio::test(start_paused = true)]
async fn equivalent_queries_coalesce_after_normalization() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .then(Step::ok(search_body(&[(1, "Pasta")])).after(Duration::from_millis(50))),
    );
    let client = client_with(&transport, test_options());

    let (a, b) = tokio::join!(
        client.search_recipes("Pasta ", 12, 0),
        client.search_recipes("  pasta", 12, 0)
    );

    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn different_parameters_are_separate_calls() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .then(Step::ok(search_body(&[(1, "Pasta")])))
            .then(Step::ok(search_body(&[(2, "Pasta Bake")]))),
    );
    let client = client_with(&transport, test_options());

    let first = client.search_recipes("pasta", 12, 0).await.unwrap();
    let second = client.search_recipes("pasta", 12, 12).await.unwrap();

    assert_ne!(first, second);
    assert_eq!(transport.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn cached_response_skips_the_network() {
    let transport =
        Arc::new(ScriptedTransport::new().then(Step::ok(random_body(&[(7, "Shakshuka")]))));
    let client = client_with(&transport, test_options());

    let first = client.random_recipes(12).await.unwrap();
    let second = client.random_recipes(12).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(transport.calls(), 1);
    assert_eq!(client.context().cache().stats().hits, 1);
}

#[tokio::test(start_paused = true)]
async fn expired_entry_is_fetched_again() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .then(Step::ok(random_body(&[(1, "Old")])))
            .then(Step::ok(random_body(&[(2, "New")]))),
    );
    let cache = BoundedCache::new(Duration::from_secs(60), 16);
    let client = client_with_cache(&transport, cache, test_options());

    let first = client.random_recipes(12).await.unwrap();
    tokio::time::advance(Duration::from_secs(61)).await;
    let second = client.random_recipes(12).await.unwrap();

    assert_eq!(first.recipes[0].title, "Old");
    assert_eq!(second.recipes[0].title, "New");
    assert_eq!(transport.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn disabled_cache_always_hits_the_network() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .then(Step::ok(random_body(&[(1, "One")])))
            .then(Step::ok(random_body(&[(1, "One")]))),
    );
    let cache = BoundedCache::new(Duration::ZERO, 16);
    let client = client_with_cache(&transport, cache, test_options());

    client.random_recipes(12).await.unwrap();
    client.random_recipes(12).await.unwrap();

    assert_eq!(transport.calls(), 2);
    assert!(client.context().cache().is_empty());
}

#[tokio::test(start_paused = true)]
async fn server_errors_are_retried_until_the_limit() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .then(Step::status(500))
            .then(Step::status(502))
            .then(Step::status(503)),
    );
    let client = client_with(&transport, test_options());

    let err = client.search_recipes("pasta", 12, 0).await.unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert_eq!(transport.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn transient_failure_then_success_resolves() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .then(Step::error(FetchError::Network("connection reset".into())))
            .then(Step::ok(search_body(&[(3, "Ramen")]))),
    );
    let client = client_with(&transport, test_options());

    let response = client.search_recipes("ramen", 12, 0).await.unwrap();

    assert_eq!(response.results[0].title, "Ramen");
    assert_eq!(transport.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn client_errors_are_not_retried() {
    let transport = Arc::new(ScriptedTransport::new().then(Step::status(404)));
    let client = client_with(&transport, test_options());

    let err = client.recipe_details(999_999).await.unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn failures_are_not_cached() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .then(Step::status(404))
            .then(Step::ok(random_body(&[(4, "Toast")]))),
    );
    let client = client_with(&transport, test_options());

    assert!(client.random_recipes(3).await.is_err());
    assert!(client.random_recipes(3).await.is_ok());
    assert_eq!(transport.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn hung_attempts_time_out_and_are_retried() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .then(Step::hang())
            .then(Step::hang())
            .then(Step::hang()),
    );
    let mut options = test_options();
    options.timeout = Duration::from_secs(1);
    let client = client_with(&transport, options);

    let err = client.random_recipes(12).await.unwrap_err();

    assert_eq!(err, FetchError::Timeout(Duration::from_secs(1)));
    assert_eq!(transport.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn timeout_then_success_resolves() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .then(Step::hang())
            .then(Step::ok(random_body(&[(5, "Soup")]))),
    );
    let mut options = test_options();
    options.timeout = Duration::from_secs(1);
    let client = client_with(&transport, options);

    let response = client.random_recipes(12).await.unwrap();

    assert_eq!(response.recipes[0].title, "Soup");
    assert_eq!(transport.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn malformed_body_is_a_parse_error_without_retry() {
    let transport = Arc::new(ScriptedTransport::new().then(Step::body(200, "<html>oops</html>")));
    let client = client_with(&transport, test_options());

    let err = client.search_recipes("pasta", 12, 0).await.unwrap_err();

    assert!(matches!(err, FetchError::Parse { .. }), "got {err:?}");
    assert_eq!(transport.calls(), 1);
    assert!(client.context().cache().is_empty());
}

#[tokio::test(start_paused = true)]
async fn invalid_requests_never_reach_the_network() {
    let transport = Arc::new(ScriptedTransport::new());
    let client = client_with(&transport, test_options());

    let missing_id = client.fetch(&LogicalRequest::new(Operation::Details)).await;
    let smuggled_key = client
        .fetch(&LogicalRequest::search("pasta", 12, 0).with_param("apiKey", "other"))
        .await;

    assert!(matches!(missing_id, Err(FetchError::InvalidRequest(_))));
    assert!(matches!(smuggled_key, Err(FetchError::InvalidRequest(_))));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn abandoned_request_still_fills_the_cache() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .then(Step::ok(search_body(&[(6, "Tacos")])).after(Duration::from_millis(200))),
    );
    let client = client_with(&transport, test_options());

    let caller = {
        let client = client.clone();
        tokio::spawn(async move { client.search_recipes("tacos", 12, 0).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    caller.abort();
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(client.context().cache().len(), 1);
    let response = client.search_recipes("tacos", 12, 0).await.unwrap();
    assert_eq!(response.results[0].title, "Tacos");
    assert_eq!(transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn requests_carry_the_key_but_errors_do_not() {
    let transport = Arc::new(ScriptedTransport::new().then(Step::status(401)));
    let mut options = test_options();
    options.retry = RetryPolicy::none();
    let client = client_with(&transport, options);

    let err = client.search_recipes("pasta", 12, 0).await.unwrap_err();

    let sent = &transport.urls()[0];
    assert_eq!(sent.path(), "/recipes/complexSearch");
    assert!(
        sent.query_pairs()
            .any(|(k, v)| k == "apiKey" && v == helpers::API_KEY)
    );
    assert!(sent.query_pairs().any(|(k, v)| k == "query" && v == "pasta"));
    assert!(!err.to_string().contains(helpers::API_KEY));
}

#[tokio::test(start_paused = true)]
async fn details_put_the_id_in_the_path() {
    let transport = Arc::new(ScriptedTransport::new().then(Step::ok(serde_json::json!({
        "id": 716429,
        "title": "Pasta with Garlic",
        "extendedIngredients": [],
        "instructions": "<ol><li>Boil.</li></ol>"
    }))));
    let client = client_with(&transport, test_options());

    let details = client.recipe_details(716429).await.unwrap();

    assert_eq!(details.recipe.title, "Pasta with Garlic");
    assert_eq!(transport.urls()[0].path(), "/recipes/716429/information");
}

#[tokio::test(start_paused = true)]
async fn wrong_shape_body_is_not_cached_and_next_call_refetches() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .then(Step::ok(serde_json::json!({ "recipes": [{ "id": 1, "title": null }] })))
            .then(Step::ok(random_body(&[(2, "Lentil Soup")]))),
    );
    let client = client_with(&transport, test_options());

    let err = client.random_recipes(12).await.unwrap_err();
    let FetchError::Parse { url, message } = &err else {
        panic!("expected a parse error, got {err:?}");
    };
    assert!(url.contains("/recipes/random"), "got {url}");
    assert!(!url.contains(helpers::API_KEY));
    assert!(message.contains("recipes[0].title"), "got {message}");
    assert!(client.context().cache().is_empty());

    let response = client.random_recipes(12).await.unwrap();
    assert_eq!(response.recipes[0].title, "Lentil Soup");
    assert_eq!(transport.calls(), 2);
}

// governor keeps its own clock, so this runs in real time.
#[tokio::test]
async fn rate_limit_spaces_out_network_attempts() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on("/random", Step::ok(random_body(&[(1, "Pho")])))
            .on("/complexSearch", Step::ok(search_body(&[(2, "Pasta")]))),
    );
    let mut options = test_options();
    options.requests_per_second = 1;
    let client = client_with(&transport, options);
    assert!(client.is_rate_limited());

    let start = std::time::Instant::now();
    client.random_recipes(12).await.unwrap();
    let first = start.elapsed();
    client.search_recipes("pasta", 12, 0).await.unwrap();

    assert!(first < Duration::from_millis(500), "first took {first:?}");
    assert!(start.elapsed() >= Duration::from_millis(900));
    assert_eq!(transport.calls(), 2);
}
