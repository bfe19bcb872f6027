//! Basic example: validate an address and list carrier accounts.
//!
//! This example shows how to:
//! - Create a client from an API key
//! - Call the typed domain operations
//! - Make a raw JSON-RPC call and inspect the call details
//!
//! Set `SHIPENGINE_API_KEY` (a `TEST_` key works against the sandbox) and
//! optionally `CLIENT_BASE_URI` to point at a simulator.
//!
//! Run with: `cargo run --example basic_call`

use shipengine::models::Address;
use shipengine::{Error, ShipEngine};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("shipengine=debug,basic_call=info")
        .init();

    let api_key = std::env::var("SHIPENGINE_API_KEY").unwrap_or_default();
    let client = ShipEngine::new(api_key)?;

    println!("=== Address validation ===");
    let address = Address::new(
        vec!["4 Jersey St".to_string(), "Suite 200".to_string()],
        "Boston",
        "MA",
        "02215",
        "US",
    )?
    .residential(false);

    let result = client.validate_address(&address, None).await?;
    println!("Valid: {:?}", result.is_valid);
    if let Some(normalized) = &result.normalized_address {
        println!("Normalized: {:?}", normalized.street);
    }
    println!();

    println!("=== Carrier accounts ===");
    for account in client.cached_carrier_accounts(None, None).await? {
        println!("{} {} ({})", account.carrier_code, account.account_id, account.name);
    }
    println!();

    println!("=== Raw call ===");
    let response = client.call("carrier.listAccounts.v1", None, None).await?;
    println!("Request id: {}", response.request_id);
    println!("Latency: {:?}", response.latency);
    println!("Attempts: {}", response.attempts);
    println!("Result: {}", response.data);

    Ok(())
}
