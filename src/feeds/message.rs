//! Wire messages for the streaming feed
//!
//! Inbound frames decode in two stages: the envelope first, with the payload
//! left as raw JSON, then the payload into the variant selected by
//! `(channel, action)`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{
    BookCode, Channel, Error, FeedEvent, Offer, OrderBookSnapshot, Result, Trade, TradeBatch,
};

const ACTION_SUBSCRIBE: &str = "subscribe";

/// Outbound `{"action":"subscribe","book":..,"type":..}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscribeRequest {
    action: &'static str,
    pub book: BookCode,
    #[serde(rename = "type")]
    pub channel: Channel,
}

impl SubscribeRequest {
    pub fn new(book: BookCode, channel: Channel) -> Self {
        Self {
            action: ACTION_SUBSCRIBE,
            book,
            channel,
        }
    }

    pub fn to_frame(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Outer shape shared by every inbound frame
#[derive(Debug, Deserialize)]
pub struct InboundEnvelope {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(rename = "type")]
    pub channel: Channel,
    #[serde(default)]
    pub book: Option<BookCode>,
    #[serde(default)]
    pub sequence: Option<i64>,
    /// Present on subscribe acknowledgments
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub payload: Option<Value>,
}

impl InboundEnvelope {
    fn is_ack(&self) -> bool {
        self.action.as_deref() == Some(ACTION_SUBSCRIBE)
    }

    fn has_no_action(&self) -> bool {
        self.action.as_deref().is_none_or(str::is_empty)
    }

    fn take_book(&mut self) -> Result<BookCode> {
        self.book
            .take()
            .ok_or_else(|| Error::Framing(format!("{} frame without book", self.channel)))
    }

    fn take_payload(&mut self) -> Result<Value> {
        self.payload
            .take()
            .ok_or_else(|| Error::Framing(format!("{} frame without payload", self.channel)))
    }
}

#[derive(Debug, Deserialize)]
struct OrdersPayload {
    #[serde(default)]
    bids: Vec<Offer>,
    #[serde(default)]
    asks: Vec<Offer>,
}

/// Result of dispatching one inbound frame
#[derive(Debug, PartialEq)]
pub enum Inbound {
    KeepAlive,
    /// Subscription acknowledged; informational only
    Ack {
        channel: Channel,
        response: Option<String>,
    },
    Event(FeedEvent),
}

/// Decode and dispatch one text frame. Any error is a framing error.
pub fn decode(text: &str) -> Result<Inbound> {
    let mut envelope: InboundEnvelope = serde_json::from_str(text)
        .map_err(|e| Error::Framing(format!("unknown incoming message format: {}", e)))?;

    let channel = envelope.channel;
    match channel {
        Channel::KeepAlive => Ok(Inbound::KeepAlive),

        Channel::Orders | Channel::Trades if envelope.is_ack() => Ok(Inbound::Ack {
            channel,
            response: envelope.response,
        }),

        Channel::Orders if envelope.has_no_action() => {
            let book = envelope.take_book()?;
            let payload: OrdersPayload = serde_json::from_value(envelope.take_payload()?)
                .map_err(|e| Error::Framing(format!("orders payload: {}", e)))?;

            Ok(Inbound::Event(FeedEvent::OrderBook(OrderBookSnapshot {
                book,
                sequence: envelope.sequence,
                bids: payload.bids,
                asks: payload.asks,
            })))
        }

        Channel::Trades if envelope.has_no_action() => {
            let book = envelope.take_book()?;
            let trades: Vec<Trade> = serde_json::from_value(envelope.take_payload()?)
                .map_err(|e| Error::Framing(format!("trades payload: {}", e)))?;

            Ok(Inbound::Event(FeedEvent::Trades(TradeBatch {
                book,
                sequence: envelope.sequence,
                trades,
            })))
        }

        channel => Err(Error::Framing(format!(
            "unexpected frame: channel '{}', action '{}'",
            channel,
            envelope.action.as_deref().unwrap_or("")
        ))),
    }
}

/// Keep-alive content; the peer ignores it
pub fn keepalive_frame() -> String {
    chrono::Utc::now().to_rfc3339()
}
