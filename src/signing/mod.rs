//! Request signing and authentication utilities for Kraken.
//!
//! This module provides utilities for:
//! - Form-encoding private request payloads
//! - Computing the `API-Sign` header
//! - Generating strictly increasing nonces

use std::sync::atomic::{AtomicU64, Ordering};

use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};
use tracing::debug;

use crate::error::SigningError;

type HmacSha512 = Hmac<Sha512>;

/// URL-encode form fields in the given order.
pub fn encode_form<'a, I>(fields: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in fields {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

/// Compute Kraken's `API-Sign` value.
///
/// `HMAC-SHA512(base64_decode(secret), path || SHA256(nonce || postdata))`,
/// base64 encoded. `postdata` must be exactly the body that is sent,
/// nonce field included.
pub fn sign(path: &str, nonce: &str, postdata: &str, secret: &str) -> Result<String, SigningError> {
    let key = general_purpose::STANDARD.decode(secret)?;

    let mut sha = Sha256::new();
    sha.update(nonce.as_bytes());
    sha.update(postdata.as_bytes());
    let inner = sha.finalize();

    let mut mac = HmacSha512::new_from_slice(&key).map_err(|_| SigningError::InvalidKeyLength)?;
    mac.update(path.as_bytes());
    mac.update(&inner);

    Ok(general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

/// Strictly increasing nonce source.
///
/// Nonces are milliseconds since the Unix epoch; when the clock has not
/// advanced since the last nonce (or went backwards) the previous value is
/// bumped by one instead.
#[derive(Debug, Default)]
pub struct NonceGenerator {
    last: AtomicU64,
}

impl NonceGenerator {
    /// Create a generator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Next nonce.
    pub fn next(&self) -> u64 {
        let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
        let mut current = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(current + 1);
            match self.last.compare_exchange_weak(
                current,
                candidate,
                Ordering::SeqCst,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    debug!(nonce = candidate, "Generated nonce");
                    return candidate;
                }
                Err(actual) => current = actual,
            }
        }
    }
}
