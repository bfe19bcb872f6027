//! Example demonstrating error handling.
//!
//! This example shows how to:
//! - Catch local validation failures before anything is sent
//! - Branch on the error variant returned by the API
//! - Read the request id, source, type and code of any error
//!
//! Run with: `cargo run --example error_handling`

use shipengine::models::Address;
use shipengine::{Error, ErrorCode, ShipEngine};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("shipengine=info")
        .init();

    println!("=== Invalid configuration ===");
    match ShipEngine::new("") {
        Ok(_) => println!("Unexpectedly accepted an empty API key"),
        Err(e) => print_error(&e),
    }
    println!();

    println!("=== Invalid address ===");
    match Address::new(vec![], "Boston", "MA", "", "US") {
        Ok(_) => println!("Unexpectedly accepted an address without street lines"),
        Err(e) => print_error(&e),
    }
    println!();

    println!("=== API errors ===");
    let api_key = std::env::var("SHIPENGINE_API_KEY").unwrap_or_else(|_| "TEST_invalid".into());
    let client = ShipEngine::new(api_key)?;

    match client.track_package("pkg_1FedExAccepted", None).await {
        Ok(result) => println!("Tracking events: {}", result.events.len()),
        Err(Error::Validation(details)) => println!("Rejected by validation: {}", details),
        Err(Error::ClientSecurity(details)) => println!("Check your API key: {}", details),
        Err(Error::RateLimitExceeded { retry_after, .. }) => {
            println!("Rate limited, cooldown {:?}", retry_after)
        }
        Err(e) if e.error_code() == Some(ErrorCode::Timeout) => {
            println!("Timed out: {}", e)
        }
        Err(e) => print_error(&e),
    }

    Ok(())
}

fn print_error(e: &Error) {
    println!("Error: {}", e);
    println!("  request id: {:?}", e.request_id());
    println!("  source:     {:?}", e.error_source());
    println!("  type:       {:?}", e.error_type());
    println!("  code:       {:?}", e.error_code());
    println!("  retryable:  {}", e.is_retryable());
}
