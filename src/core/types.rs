//! Core types - Strong typing for the feed and REST payloads

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Book identifier for a tradable pair, `major_minor` (e.g. "btc_mxn")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookCode(Cow<'static, str>);

impl BookCode {
    // MXN markets
    pub const BTC_MXN: BookCode = BookCode::from_static("btc_mxn");
    pub const ETH_MXN: BookCode = BookCode::from_static("eth_mxn");
    pub const XRP_MXN: BookCode = BookCode::from_static("xrp_mxn");
    pub const LTC_MXN: BookCode = BookCode::from_static("ltc_mxn");
    pub const BCH_MXN: BookCode = BookCode::from_static("bch_mxn");
    pub const TUSD_MXN: BookCode = BookCode::from_static("tusd_mxn");
    pub const MANA_MXN: BookCode = BookCode::from_static("mana_mxn");
    pub const GNT_MXN: BookCode = BookCode::from_static("gnt_mxn");
    pub const BAT_MXN: BookCode = BookCode::from_static("bat_mxn");

    // BTC markets
    pub const ETH_BTC: BookCode = BookCode::from_static("eth_btc");
    pub const XRP_BTC: BookCode = BookCode::from_static("xrp_btc");
    pub const LTC_BTC: BookCode = BookCode::from_static("ltc_btc");
    pub const BCH_BTC: BookCode = BookCode::from_static("bch_btc");
    pub const TUSD_BTC: BookCode = BookCode::from_static("tusd_btc");
    pub const MANA_BTC: BookCode = BookCode::from_static("mana_btc");
    pub const GNT_BTC: BookCode = BookCode::from_static("gnt_btc");
    pub const BAT_BTC: BookCode = BookCode::from_static("bat_btc");

    pub fn new(s: impl Into<String>) -> Self {
        Self(Cow::Owned(s.into().to_lowercase()))
    }

    pub const fn from_static(s: &'static str) -> Self {
        Self(Cow::Borrowed(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into (major, minor) currency codes; `None` unless exactly `maj_min`
    pub fn split(&self) -> Option<(CurrencyCode, CurrencyCode)> {
        let mut parts = self.0.split('_');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(major), Some(minor), None) if !major.is_empty() && !minor.is_empty() => {
                Some((CurrencyCode::new(major), CurrencyCode::new(minor)))
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for BookCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}

/// Currency identifier (e.g. "btc")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyCode(Cow<'static, str>);

impl CurrencyCode {
    pub const BTC: CurrencyCode = CurrencyCode::from_static("btc");
    pub const MXN: CurrencyCode = CurrencyCode::from_static("mxn");
    pub const ETH: CurrencyCode = CurrencyCode::from_static("eth");
    pub const XRP: CurrencyCode = CurrencyCode::from_static("xrp");
    pub const LTC: CurrencyCode = CurrencyCode::from_static("ltc");
    pub const BCH: CurrencyCode = CurrencyCode::from_static("bch");
    pub const TUSD: CurrencyCode = CurrencyCode::from_static("tusd");
    pub const MANA: CurrencyCode = CurrencyCode::from_static("mana");
    pub const GNT: CurrencyCode = CurrencyCode::from_static("gnt");
    pub const BAT: CurrencyCode = CurrencyCode::from_static("bat");

    pub fn new(s: impl Into<String>) -> Self {
        Self(Cow::Owned(s.into().to_lowercase()))
    }

    pub const fn from_static(s: &'static str) -> Self {
        Self(Cow::Borrowed(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}

/// Named stream within the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    #[serde(rename = "trades")]
    Trades,
    #[serde(rename = "orders")]
    Orders,
    /// Reserved, never decoded
    #[serde(rename = "diff-orders")]
    DiffOrders,
    #[serde(rename = "ka")]
    KeepAlive,
    #[serde(other)]
    Unknown,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Trades => "trades",
            Channel::Orders => "orders",
            Channel::DiffOrders => "diff-orders",
            Channel::KeepAlive => "ka",
            Channel::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order side, encoded on the wire as 0 (buy) / 1 (sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Side {
    Buy,
    Sell,
}

impl TryFrom<u8> for Side {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Side::Buy),
            1 => Ok(Side::Sell),
            other => Err(format!("invalid side {}", other)),
        }
    }
}

impl From<Side> for u8 {
    fn from(side: Side) -> u8 {
        match side {
            Side::Buy => 0,
            Side::Sell => 1,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Single priced quantity on one side of the book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    /// Minor units per one major unit
    #[serde(rename = "r")]
    pub rate: Decimal,
    /// Major units
    #[serde(rename = "a")]
    pub amount: Decimal,
    /// Minor units
    #[serde(rename = "v")]
    pub value: Decimal,
    #[serde(rename = "t")]
    pub side: Side,
    #[serde(rename = "d", with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// Executed trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    #[serde(rename = "i")]
    pub id: i64,
    /// Major units
    #[serde(rename = "a")]
    pub amount: Decimal,
    /// Minor units
    #[serde(rename = "r")]
    pub rate: Decimal,
    /// Minor units
    #[serde(rename = "v")]
    pub value: Decimal,
    /// Maker side
    #[serde(rename = "t")]
    pub side: Side,
    #[serde(rename = "mo")]
    pub maker_order_id: String,
    #[serde(rename = "to")]
    pub taker_order_id: String,
}

/// Full book as pushed on the `orders` channel
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBookSnapshot {
    pub book: BookCode,
    pub sequence: Option<i64>,
    pub bids: Vec<Offer>,
    pub asks: Vec<Offer>,
}

impl OrderBookSnapshot {
    pub fn best_bid(&self) -> Option<&Offer> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&Offer> {
        self.asks.first()
    }
}

/// Trades pushed on the `trades` channel, in exchange order
#[derive(Debug, Clone, PartialEq)]
pub struct TradeBatch {
    pub book: BookCode,
    pub sequence: Option<i64>,
    pub trades: Vec<Trade>,
}

/// Event delivered to the feed consumer
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    OrderBook(OrderBookSnapshot),
    Trades(TradeBatch),
    /// Terminal; the connection is dead
    Disconnected,
}
