use tracing_subscriber::{EnvFilter, fmt};

use bitso_feed::{Channel, Config, FeedEvent, RestClient, WsFeed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load_default();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},bitso_feed=debug", config.log_level)));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_level(true)
        .init();

    config.validate()?;

    // 1. Discover books over REST
    let rest = RestClient::new(&config.rest)?;
    tracing::info!("Pulling books..");
    let books = rest.available_books().await?;
    tracing::info!("Loaded {} books", books.len());

    // 2. Connect the feed and subscribe every book
    let feed = WsFeed::new(config.feed.clone());
    let mut events = feed.connect().await?;

    for code in books.keys() {
        feed.subscribe(code.clone(), Channel::Orders).await?;
        feed.subscribe(code.clone(), Channel::Trades).await?;
    }

    // 3. Drain until the connection dies; Ctrl-C asks for a clean disconnect
    let mut interrupted = false;
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(FeedEvent::OrderBook(snapshot)) => {
                    let bid = snapshot
                        .best_bid()
                        .map(|o| format!("BID: {:.8} @ ${:.8}", o.amount, o.rate))
                        .unwrap_or_else(|| "BID: --".to_string());
                    let ask = snapshot
                        .best_ask()
                        .map(|o| format!("ASK: {:.8} @ ${:.8}", o.amount, o.rate))
                        .unwrap_or_else(|| "ASK: --".to_string());
                    tracing::info!("[{}] {} | {}", snapshot.book, bid, ask);
                }
                Some(FeedEvent::Trades(batch)) => {
                    for trade in &batch.trades {
                        tracing::info!(
                            "[{}] TRADE: [{}] {:.8} @ ${:.8} = ${:.2}",
                            batch.book, trade.side, trade.amount, trade.rate, trade.value
                        );
                    }
                }
                Some(FeedEvent::Disconnected) | None => {
                    tracing::info!("Bitso websocket was disconnected!");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                tracing::info!("interrupt!");
                interrupted = true;
                feed.disconnect();
            }
        }
    }

    tracing::info!("Program ended.");
    Ok(())
}
