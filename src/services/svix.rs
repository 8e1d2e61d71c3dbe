// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signature verification for identity-provider webhooks (Svix format).
//!
//! The signed content is `{svix-id}.{svix-timestamp}.{body}`, HMAC-SHA256
//! with the base64 secret that follows `whsec_`. The `svix-signature`
//! header holds one or more space-separated `v1,<base64>` entries; any
//! match is accepted.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Largest accepted clock skew between sender and receiver.
pub const TOLERANCE_SECS: i64 = 5 * 60;

const SECRET_PREFIX: &str = "whsec_";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("webhook secret is not valid base64")]
    InvalidSecret,
    #[error("timestamp header is not a unix time")]
    InvalidTimestamp,
    #[error("timestamp outside tolerance")]
    Expired,
    #[error("no matching signature")]
    Mismatch,
}

fn mac_for(secret: &str, msg_id: &str, timestamp: &str, body: &[u8]) -> Result<HmacSha256, SignatureError> {
    let key = BASE64
        .decode(secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret))
        .map_err(|_| SignatureError::InvalidSecret)?;

    let mut mac = HmacSha256::new_from_slice(&key).map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(msg_id.as_bytes());
    mac.update(b".");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    Ok(mac)
}

/// `v1,<base64>` signature for a message.
pub fn sign(secret: &str, msg_id: &str, timestamp: &str, body: &[u8]) -> Result<String, SignatureError> {
    let mac = mac_for(secret, msg_id, timestamp, body)?;
    Ok(format!("v1,{}", BASE64.encode(mac.finalize().into_bytes())))
}

/// Check a delivery against the signing secret, with `now` in unix seconds.
pub fn verify(
    secret: &str,
    msg_id: &str,
    timestamp: &str,
    signatures: &str,
    body: &[u8],
    now: i64,
) -> Result<(), SignatureError> {
    let sent_at: i64 = timestamp
        .trim()
        .parse()
        .map_err(|_| SignatureError::InvalidTimestamp)?;
    if (now - sent_at).abs() > TOLERANCE_SECS {
        return Err(SignatureError::Expired);
    }

    let expected = mac_for(secret, msg_id, timestamp, body)?
        .finalize()
        .into_bytes();

    let matched = signatures
        .split_whitespace()
        .filter_map(|entry| entry.strip_prefix("v1,"))
        .filter_map(|sig| BASE64.decode(sig).ok())
        .any(|sig| bool::from(sig.as_slice().ct_eq(expected.as_slice())));

    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}
