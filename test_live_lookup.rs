#![allow(clippy::uninlined_format_args)]

use phoneblock_screen::normalize_to_e164;
use phoneblock_screen::reputation::ReputationClient;
use phoneblock_screen::transport::ReqwestTransport;
use phoneblock_screen::ScreenerConfig;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    println!("Testing REAL PhoneBlock lookups (needs PHONEBLOCK_API_TOKEN)...");

    let mut config = ScreenerConfig::default();
    config.apply_env_overrides();
    if config.bearer_token.is_empty() {
        anyhow::bail!("PHONEBLOCK_API_TOKEN is not set");
    }

    let transport = Arc::new(ReqwestTransport::new(config.http_timeout_seconds)?);
    let client = ReputationClient::new(
        transport,
        &config.api_base,
        config.bearer_token.clone(),
        config.country_code.clone(),
    )?;

    let numbers: Vec<String> = std::env::args().skip(1).collect();
    let numbers = if numbers.is_empty() {
        vec!["0891234567".to_string()]
    } else {
        numbers
    };

    for number in numbers {
        let e164 = normalize_to_e164(&number);
        println!("\n=== {} (normalized: {}) ===", number, e164);

        let result = client.lookup(&e164).await;
        if result.succeeded {
            println!("✅ Lookup succeeded");
            println!("  Votes: {}", result.votes);
            println!("  Rating: {}", result.rating);
            println!("  Body: {}", result.raw_body);
        } else {
            println!("❌ No candidate format was accepted");
        }
    }

    Ok(())
}
