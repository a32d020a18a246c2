//! Shared request utilities: authorization, endpoint sanitization and the
//! response envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use channel_client::Protocol;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Body returned by every successful handler.
pub const SUCCESS: &str = "Success";

/// Check a caller-supplied key against the configured secret.
///
/// Compares SHA-256 digests so the comparison time does not depend on where
/// the keys first differ.
pub fn authorize(provided: &str, secret: &SecretString) -> bool {
    let provided = Sha256::digest(provided.as_bytes());
    let expected = Sha256::digest(secret.expose_secret().as_bytes());

    provided
        .iter()
        .zip(expected.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// A phone number normalized for subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedEndpoint {
    /// Eleven digits, leading "1"
    pub endpoint: String,
    pub protocol: Protocol,
}

/// Normalize a free-form North American phone number.
///
/// Hyphens, parentheses and whitespace are stripped and the rest must parse
/// as an integer, where single underscores may separate digits
/// ("555_123_4567"). Ten-digit numbers get a leading "1"; eleven-digit
/// numbers must already start with "1".
pub fn sanitize_endpoint(input: &str) -> Option<SanitizedEndpoint> {
    let stripped: String = input
        .chars()
        .filter(|c| !matches!(c, '-' | '(' | ')') && !c.is_whitespace())
        .collect();

    if !separators_between_digits(&stripped) {
        return None;
    }
    let joined = stripped.replace('_', "");

    // Integer round trip drops a leading '+' and leading zeros
    let mut digits = joined.parse::<u64>().ok()?.to_string();

    if digits.len() == 10 {
        digits.insert(0, '1');
    }

    if digits.len() == 11 && digits.starts_with('1') {
        Some(SanitizedEndpoint {
            endpoint: digits,
            protocol: Protocol::Sms,
        })
    } else {
        None
    }
}

/// Every '_' must sit between two digits.
fn separators_between_digits(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.iter().enumerate().all(|(i, &b)| {
        b != b'_'
            || (i > 0
                && bytes[i - 1].is_ascii_digit()
                && bytes.get(i + 1).is_some_and(u8::is_ascii_digit))
    })
}

/// Fixed-shape response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub is_base64_encoded: bool,
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: serde_json::Value,
}

impl ApiResponse {
    pub fn new(status_code: u16, body: impl Into<serde_json::Value>) -> Self {
        Self {
            is_base64_encoded: false,
            status_code,
            headers: BTreeMap::from([("Content-Type".to_string(), "application/json".to_string())]),
            body: body.into(),
        }
    }

    pub fn success() -> Self {
        Self::new(200, SUCCESS)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}
