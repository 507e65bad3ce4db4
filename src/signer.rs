//! Request signing for the private REST API

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

pub trait Signer: Send + Sync {
    fn sign(&self, payload: &[u8]) -> Vec<u8>;
    fn key_id(&self) -> &str;
}

/// HMAC-SHA256 signer keyed by the account's API secret
pub struct HmacSigner {
    api_key: String,
    api_secret: String,
}

impl HmacSigner {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }
}

impl Signer for HmacSigner {
    fn sign(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }

    fn key_id(&self) -> &str {
        &self.api_key
    }
}

/// Current epoch milliseconds as a decimal string
pub fn nonce() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
        .to_string()
}

/// `Authorization` header value: `Bitso <key>:<nonce>:<hex-hmac(nonce+method+path+body)>`
pub fn auth_header(signer: &dyn Signer, nonce: &str, method: &str, path: &str, body: &str) -> String {
    let message = format!("{}{}{}{}", nonce, method, path, body);
    let signature = hex::encode(signer.sign(message.as_bytes()));
    format!("Bitso {}:{}:{}", signer.key_id(), nonce, signature)
}
