//! Token claims decoding.
//!
//! Decoding only reads the header or payload of a token. The signature is
//! never verified: tokens are issued to us, not by us, and we hold no key.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DecodeError;

/// Options controlling how a token is decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeOptions {
    /// Decode the header segment instead of the payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<bool>,
}

impl DecodeOptions {
    /// Options that decode the header segment.
    pub fn header() -> Self {
        Self { header: Some(true) }
    }

    /// Combine two option sets; values set in `overrides` win.
    pub fn merged_with(&self, overrides: &DecodeOptions) -> DecodeOptions {
        DecodeOptions {
            header: overrides.header.or(self.header),
        }
    }
}

/// Decoded token claims.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Expiry in unix seconds. Absent means the token never expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Every other claim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// Look up a claim other than `exp`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }

    /// Check expiry against `now` (unix seconds). The boundary is inclusive.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.exp.is_some_and(|exp| exp <= now)
    }
}

/// Decode the claims of a token.
///
/// # Errors
///
/// Fails if the token is not made of three segments, or if the selected
/// segment is not base64url-encoded JSON.
///
/// # Example
///
/// ```
/// use tokenkeeper_core::claims::{decode, DecodeOptions};
///
/// // {"alg":"HS256","typ":"JWT"} . {"sub":"alice","exp":1700000000} . signature
/// let token = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.eyJzdWIiOiJhbGljZSIsImV4cCI6MTcwMDAwMDAwMH0.c2ln";
/// let claims = decode(token, &DecodeOptions::default()).unwrap();
/// assert_eq!(claims.exp, Some(1700000000));
/// assert_eq!(claims.get("sub").and_then(|v| v.as_str()), Some("alice"));
/// ```
pub fn decode(token: &str, options: &DecodeOptions) -> Result<Claims, DecodeError> {
    if options.header == Some(true) {
        decode_header(token)
    } else {
        decode_payload(token)
    }
}

fn decode_header(token: &str) -> Result<Claims, DecodeError> {
    let header = jsonwebtoken::decode_header(token).map_err(|e| map_jwt(HEADER, &e))?;
    serde_json::to_value(header)
        .and_then(serde_json::from_value)
        .map_err(|e| DecodeError::Json {
            part: HEADER,
            reason: e.to_string(),
        })
}

fn decode_payload(token: &str) -> Result<Claims, DecodeError> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| map_jwt(PAYLOAD, &e))
}

const HEADER: usize = 1;
const PAYLOAD: usize = 2;

fn map_jwt(part: usize, err: &jsonwebtoken::errors::Error) -> DecodeError {
    match err.kind() {
        ErrorKind::InvalidToken => DecodeError::MissingPart { part },
        ErrorKind::Base64(e) => DecodeError::Base64 {
            part,
            reason: e.to_string(),
        },
        ErrorKind::Json(e) => DecodeError::Json {
            part,
            reason: e.to_string(),
        },
        _ => DecodeError::Malformed {
            reason: err.to_string(),
        },
    }
}
