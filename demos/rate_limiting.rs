//! Example demonstrating rate limit handling against a local mock server.
//!
//! This example shows how to:
//! - Let the client wait out a short cooldown and retry
//! - See a cooldown longer than the timeout fail fast
//! - Watch every attempt through event listeners
//!
//! Run with: `cargo run --example rate_limiting`

use serde_json::json;
use shipengine::events::{EventName, TracingListener};
use shipengine::{Config, ConfigOverride, Error, ShipEngine};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("shipengine=debug")
        .init();

    let server = MockServer::start().await;
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    // Every other request is rate limited with a 2 second cooldown
    Mock::given(method("POST"))
        .respond_with(move |_req: &wiremock::Request| {
            if counter.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "2")
                    .set_body_json(json!({
                        "error": {
                            "message": "You have exceeded the rate limit.",
                            "data": { "source": "shipengine", "type": "system", "code": "rate_limit_exceeded" }
                        }
                    }))
            } else {
                ResponseTemplate::new(200).set_body_json(json!({
                    "jsonrpc": "2.0",
                    "result": { "carrierAccounts": [] }
                }))
            }
        })
        .mount(&server)
        .await;

    let config = Config::builder("TEST_demo_key")
        .base_uri(format!("{}/jsonrpc", server.uri()))
        .timeout(Duration::from_secs(5))
        .retries(1)
        .build()?;

    let client = ShipEngine::builder(config)
        .event_listener(EventName::RequestSent, Arc::new(TracingListener))
        .event_listener(EventName::ResponseReceived, Arc::new(TracingListener))
        .build()?;

    println!("=== Example 1: Cooldown shorter than the timeout ===");
    let start = Instant::now();
    let response = client.call("carrier.listAccounts.v1", None, None).await?;
    println!(
        "Succeeded after {} attempts in {:?}\n",
        response.attempts,
        start.elapsed()
    );

    println!("=== Example 2: Cooldown longer than the timeout ===");
    let short_timeout = ConfigOverride::new().timeout(Duration::from_secs(1));
    match client
        .call("carrier.listAccounts.v1", None, Some(&short_timeout))
        .await
    {
        Ok(_) => println!("Unexpected success"),
        Err(Error::ClientTimeout { retry_after, .. }) => {
            println!("Failed fast, server asked for {:?}", retry_after)
        }
        Err(e) => println!("Other error: {}", e),
    }
    println!();

    println!("=== Example 3: Retries disabled ===");
    let no_retries = ConfigOverride::new().retries(0);
    match client
        .call("carrier.listAccounts.v1", None, Some(&no_retries))
        .await
    {
        Ok(_) => println!("Got through on the first attempt"),
        Err(e) => println!("Gave up: {} (retry after {:?})", e, e.retry_after()),
    }

    println!("\nServer saw {} requests", calls.load(Ordering::SeqCst));
    Ok(())
}
