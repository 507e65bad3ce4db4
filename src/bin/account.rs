//! Print account balances and fees from the private REST API.
//!
//! Credentials come from config.toml `[rest]` or BITSO_API_KEY / BITSO_API_SECRET.

use tracing_subscriber::{EnvFilter, fmt};

use bitso_feed::{Config, RestClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load_default();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    fmt().with_env_filter(filter).with_target(false).init();

    let rest = RestClient::new(&config.rest)?;
    if !rest.has_credentials() {
        anyhow::bail!("no API credentials: set [rest] api_key/api_secret or BITSO_API_KEY/BITSO_API_SECRET");
    }

    let books = rest.available_books().await?;
    tracing::info!("Loaded {} books", books.len());

    let balances = rest.account_balance().await?;
    println!("ACCOUNT BALANCES");
    let mut currencies: Vec<_> = balances.keys().collect();
    currencies.sort();
    for code in currencies {
        let b = &balances[code];
        println!(
            "  {:<6} available {:>20}  locked {:>20}  total {:>20}",
            code, b.available, b.locked, b.total
        );
    }

    let fees = rest.account_fees().await?;
    println!("ACCOUNT FEES");
    let mut codes: Vec<_> = fees.fees.keys().collect();
    codes.sort();
    for code in codes {
        let f = &fees.fees[code];
        println!(
            "  {:<10} maker {:>6}%  taker {:>6}%",
            code, f.maker_fee_percent, f.taker_fee_percent
        );
    }
    for (currency, fee) in &fees.withdrawal_fees {
        println!("  withdrawal {:<6} {}", currency, fee);
    }

    tracing::info!("Program ended.");
    Ok(())
}
