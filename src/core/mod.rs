//! Core module - Common types, reference tables, config and error handling

pub mod config;
pub mod error;
pub mod reference;
pub mod types;

pub use config::{Config, FeedConfig, RestConfig};
pub use error::{Error, Result};
pub use reference::{Book, BookLimits, Currency, currency_list, find_book};
pub use types::*;
