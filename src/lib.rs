//! bitso-feed - Bitso market data client
//! Real-time order book and trade streaming, plus the REST calls around it

// Public modules
pub mod core;
pub mod feeds;
pub mod signer;

// Re-exports
pub use core::{
    BookCode, Channel, Config, CurrencyCode, Error, FeedConfig, FeedEvent, Offer,
    OrderBookSnapshot, RestConfig, Result, Side, Trade, TradeBatch,
};
pub use feeds::{DisconnectState, RestClient, WsFeed};
