//! Static reference tables - currencies and book limits

use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::core::{BookCode, CurrencyCode, Error, Result};

/// Currency known to this library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Currency {
    pub code: CurrencyCode,
    pub name: &'static str,
    /// Decimal places
    pub precision: u32,
}

static CURRENCIES: &[(CurrencyCode, &str, u32)] = &[
    (CurrencyCode::BTC, "Bitcoin", 8),
    (CurrencyCode::MXN, "Mexican Pesos", 2),
    (CurrencyCode::ETH, "Ethereum", 8),
    (CurrencyCode::XRP, "Ripple", 8),
    (CurrencyCode::LTC, "Litecoin", 8),
    (CurrencyCode::BCH, "Bitcoin Cash", 8),
    (CurrencyCode::TUSD, "TrueUSD", 2),
    (CurrencyCode::MANA, "Decentraland", 8),
    (CurrencyCode::GNT, "Golem", 8),
    (CurrencyCode::BAT, "Basic Attention Token", 8),
];

impl Currency {
    pub fn lookup(code: &CurrencyCode) -> Option<Currency> {
        CURRENCIES
            .iter()
            .find(|(c, _, _)| c == code)
            .map(|(c, name, precision)| Currency {
                code: c.clone(),
                name: *name,
                precision: *precision,
            })
    }

    /// Round a quantity to this currency's precision
    pub fn round(&self, value: Decimal) -> Decimal {
        value.round_dp(self.precision)
    }
}

/// Every registered currency, keyed by code
pub fn currency_list() -> HashMap<CurrencyCode, Currency> {
    CURRENCIES
        .iter()
        .map(|(code, name, precision)| {
            (
                code.clone(),
                Currency {
                    code: code.clone(),
                    name: *name,
                    precision: *precision,
                },
            )
        })
        .collect()
}

/// Tradable book with its order limits
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub code: BookCode,
    pub major: Currency,
    pub minor: Currency,
    /// Major units
    pub minimum_amount: Decimal,
    pub maximum_amount: Decimal,
    /// Minor units
    pub minimum_price: Decimal,
    pub maximum_price: Decimal,
    /// Minor units
    pub minimum_value: Decimal,
    pub maximum_value: Decimal,
}

/// Limits of a book as published by the exchange
#[derive(Debug, Clone, Default)]
pub struct BookLimits {
    pub minimum_amount: Decimal,
    pub maximum_amount: Decimal,
    pub minimum_price: Decimal,
    pub maximum_price: Decimal,
    pub minimum_value: Decimal,
    pub maximum_value: Decimal,
}

impl Book {
    /// Resolve both currencies of `code`; fails unless it is `maj_min` with registered codes
    pub fn resolve(code: BookCode, limits: BookLimits) -> Result<Self> {
        let (major_code, minor_code) = code.split().ok_or_else(|| {
            Error::InvalidBook(format!("expecting 'maj_min', got: {}", code))
        })?;

        let major = Currency::lookup(&major_code).ok_or_else(|| {
            Error::InvalidBook(format!("invalid major currency code '{}'", major_code))
        })?;
        let minor = Currency::lookup(&minor_code).ok_or_else(|| {
            Error::InvalidBook(format!("invalid minor currency code '{}'", minor_code))
        })?;

        Ok(Self {
            code,
            major,
            minor,
            minimum_amount: limits.minimum_amount,
            maximum_amount: limits.maximum_amount,
            minimum_price: limits.minimum_price,
            maximum_price: limits.maximum_price,
            minimum_value: limits.minimum_value,
            maximum_value: limits.maximum_value,
        })
    }
}

/// Find the book trading `a` against `b`, in either orientation
pub fn find_book<'a>(
    books: &'a HashMap<BookCode, Book>,
    a: &CurrencyCode,
    b: &CurrencyCode,
) -> Option<&'a Book> {
    books.values().find(|book| {
        (&book.major.code == a && &book.minor.code == b)
            || (&book.minor.code == a && &book.major.code == b)
    })
}
