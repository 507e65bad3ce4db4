//! REST client for book discovery and account queries

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::core::{Book, BookCode, CurrencyCode, Error, RestConfig, Result};
use crate::feeds::rest_model::{
    AccountFees, ApiResponse, AvailableBook, Balance, BalancePayload, FeesPayload,
};
use crate::signer::{self, HmacSigner, Signer};

/// Synchronous request/response calls against the Bitso REST API
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    signer: Option<Arc<dyn Signer>>,
}

impl RestClient {
    pub fn new(config: &RestConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .pool_idle_timeout(config.timeout())
            .build()?;

        let signer = config
            .credentials()
            .map(|(key, secret)| Arc::new(HmacSigner::new(key, secret)) as Arc<dyn Signer>);

        Ok(Self {
            client,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            signer,
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.signer.is_some()
    }

    async fn get(&self, path: &str, private: bool) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if private {
            let credentials = self.signer.as_deref().ok_or_else(|| {
                Error::Auth("client's private key/secret pair is not set".to_string())
            })?;
            let header = signer::auth_header(credentials, &signer::nonce(), "GET", path, "");
            let value = HeaderValue::from_str(&header)
                .map_err(|e| Error::Auth(format!("invalid authorization header: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        debug!("GET {}", url);
        let resp = self.client.get(&url).headers(headers).send().await?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::Http(format!("cannot read response body: {}", e)))?;

        parse_response(status, &body)
    }

    /// Public: every book with its limits. Fails on a book whose currencies are unknown.
    pub async fn available_books(&self) -> Result<HashMap<BookCode, Book>> {
        let payload = self.get("/v3/available_books/", false).await?;
        let raw: Vec<AvailableBook> = serde_json::from_value(payload)?;

        let books = raw
            .into_iter()
            .map(|entry| {
                let limits = entry.limits();
                Book::resolve(entry.book, limits).map(|book| (book.code.clone(), book))
            })
            .collect::<Result<HashMap<_, _>>>()?;

        debug!("loaded {} books", books.len());
        Ok(books)
    }

    /// Private: balances keyed by currency
    pub async fn account_balance(&self) -> Result<HashMap<CurrencyCode, Balance>> {
        let payload = self.get("/v3/balance/", true).await?;
        let raw: BalancePayload = serde_json::from_value(payload)?;

        Ok(raw
            .balances
            .into_iter()
            .map(|b| (b.currency.clone(), b))
            .collect())
    }

    /// Private: fee schedule keyed by book
    pub async fn account_fees(&self) -> Result<AccountFees> {
        let payload = self.get("/v3/fees/", true).await?;
        let raw: FeesPayload = serde_json::from_value(payload)?;

        Ok(AccountFees {
            fees: raw.fees.into_iter().map(|f| (f.book.clone(), f)).collect(),
            withdrawal_fees: raw.withdrawal_fees,
        })
    }
}

/// Unwrap the response envelope into its payload.
///
/// A non-200 status, `success=false` or a non-empty error code is a request failure.
pub fn parse_response(status: StatusCode, body: &str) -> Result<Value> {
    let msg: ApiResponse = serde_json::from_str(body)
        .map_err(|e| Error::Http(format!("cannot parse JSON in response body: {}", e)))?;

    let error = msg.error.unwrap_or_default();
    if status != StatusCode::OK || !msg.success || !error.code.is_empty() {
        let code = if error.code.is_empty() {
            status.as_str().to_string()
        } else {
            error.code
        };
        return Err(Error::Api {
            code,
            message: error.message,
        });
    }

    Ok(msg.payload.unwrap_or(Value::Null))
}
