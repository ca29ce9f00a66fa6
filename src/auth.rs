//! Request authentication for broker REST APIs.
//!
//! [`RequestSigner`] is the interceptor every connector runs on each
//! outgoing [`HttpRequest`]. It stamps the request with the credentials of
//! the session passed in, a fresh timestamp, and an HMAC signature, so a
//! new `connect()` takes effect on the very next request without touching
//! the transport.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use base64::prelude::*;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::credentials::Credentials;
use crate::error::TransportError;
use crate::transport::HttpRequest;

/// Tracks the last timestamp issued so every call returns a strictly
/// increasing value even when the wall-clock hasn't advanced.
static LAST_TIMESTAMP: AtomicU64 = AtomicU64::new(0);

/// Header names used when stamping a request.
#[derive(Debug, Clone, Copy)]
pub struct AuthHeaders {
    pub account: &'static str,
    pub timestamp: &'static str,
    pub signature: &'static str,
}

/// Stamps and signs outgoing requests.
///
/// Authorization is `Bearer <api key>`. The signature is
/// `Base64(HMAC-SHA256(secret, timestamp \n METHOD \n path[?query] \n body))`
/// where the query string is sorted by key so parameter order does not
/// change the signature.
#[derive(Debug, Clone, Copy)]
pub struct RequestSigner {
    headers: AuthHeaders,
}

impl RequestSigner {
    pub const fn new(headers: AuthHeaders) -> Self {
        Self { headers }
    }

    /// Adds authentication headers to `request` using `credentials`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Signing`] if the HMAC key is rejected.
    pub fn apply(
        &self,
        credentials: &Credentials,
        request: &mut HttpRequest,
    ) -> Result<(), TransportError> {
        let timestamp = next_timestamp();
        let payload = canonical_payload(timestamp, request);
        let signature = sign(credentials.api_secret(), &payload)?;

        request.set_header("Authorization", format!("Bearer {}", credentials.api_key()));
        request.set_header(self.headers.account, credentials.account_id());
        request.set_header(self.headers.timestamp, timestamp.to_string());
        request.set_header(self.headers.signature, signature);
        Ok(())
    }
}

/// Builds the string that gets signed.
fn canonical_payload(timestamp: u64, request: &HttpRequest) -> String {
    let mut query: Vec<_> = request.query.iter().collect();
    query.sort();
    let query = query
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let target = if query.is_empty() {
        request.path.clone()
    } else {
        format!("{}?{query}", request.path)
    };

    format!(
        "{timestamp}\n{}\n{target}\n{}",
        request.method,
        request.body.as_deref().unwrap_or("")
    )
}

/// Returns a strictly monotonically-increasing timestamp in milliseconds.
///
/// Uses the wall-clock as the baseline but guarantees that successive calls
/// always return a value larger than the previous one.
fn next_timestamp() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    let mut prev = LAST_TIMESTAMP.load(Ordering::Relaxed);
    loop {
        let ts = now.max(prev + 1);
        match LAST_TIMESTAMP.compare_exchange_weak(prev, ts, Ordering::Relaxed, Ordering::Relaxed)
        {
            Ok(_) => return ts,
            Err(actual) => prev = actual,
        }
    }
}

/// Computes `Base64(HMAC-SHA256(secret, payload))`.
fn sign(api_secret: &str, payload: &str) -> Result<String, TransportError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(api_secret.as_bytes())
        .map_err(|e| TransportError::Signing(format!("invalid HMAC key: {e}")))?;
    mac.update(payload.as_bytes());
    Ok(BASE64_STANDARD.encode(mac.finalize().into_bytes()))
}
