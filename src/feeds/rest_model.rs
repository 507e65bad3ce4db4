//! REST payload models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::core::{BookCode, BookLimits, CurrencyCode};

/// Envelope of every REST response
#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
    #[serde(default)]
    pub payload: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Entry of `/v3/available_books/`
#[derive(Debug, Clone, Deserialize)]
pub struct AvailableBook {
    pub book: BookCode,
    pub minimum_amount: Decimal,
    pub maximum_amount: Decimal,
    pub minimum_price: Decimal,
    pub maximum_price: Decimal,
    pub minimum_value: Decimal,
    pub maximum_value: Decimal,
}

impl AvailableBook {
    pub fn limits(&self) -> BookLimits {
        BookLimits {
            minimum_amount: self.minimum_amount,
            maximum_amount: self.maximum_amount,
            minimum_price: self.minimum_price,
            maximum_price: self.maximum_price,
            minimum_value: self.minimum_value,
            maximum_value: self.maximum_value,
        }
    }
}

/// Account balance for one currency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub currency: CurrencyCode,
    pub available: Decimal,
    pub locked: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BalancePayload {
    pub balances: Vec<Balance>,
}

/// Trading fee schedule for one book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fee {
    pub book: BookCode,
    pub taker_fee_decimal: Decimal,
    pub taker_fee_percent: Decimal,
    pub maker_fee_decimal: Decimal,
    pub maker_fee_percent: Decimal,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FeesPayload {
    pub fees: Vec<Fee>,
    #[serde(default)]
    pub withdrawal_fees: HashMap<CurrencyCode, Decimal>,
}

/// Trading fees keyed by book, plus per-currency withdrawal fees
#[derive(Debug, Clone, Default)]
pub struct AccountFees {
    pub fees: HashMap<BookCode, Fee>,
    pub withdrawal_fees: HashMap<CurrencyCode, Decimal>,
}
