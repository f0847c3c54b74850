//! Authentication state.

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, InvalidInputError};

/// Current unix timestamp in seconds.
pub fn unix_timestamp() -> i64 {
    Utc::now().timestamp()
}

/// Snapshot of the current credentials.
///
/// A state always holds an access token. "No credentials" is represented by
/// the absence of a state (`Option<AuthenticationState>`), never by an empty
/// token.
///
/// # Security
///
/// Token values are never shown in Debug output.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawState")]
pub struct AuthenticationState {
    /// Access token attached to requests.
    pub token: String,
    /// Access token expiry (unix seconds). `None` never expires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_expiry: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Refresh token expiry (unix seconds). `None` never expires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token_expiry: Option<i64>,
    /// When the state was established (unix seconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub established_at: Option<i64>,
    /// Additional values persisted alongside the tokens.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize)]
struct RawState {
    token: String,
    #[serde(default)]
    token_expiry: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    refresh_token_expiry: Option<i64>,
    #[serde(default)]
    established_at: Option<i64>,
    #[serde(default)]
    extra: Map<String, Value>,
}

impl TryFrom<RawState> for AuthenticationState {
    type Error = Error;

    fn try_from(raw: RawState) -> Result<Self, Self::Error> {
        let state = Self {
            token: raw.token,
            token_expiry: raw.token_expiry,
            refresh_token: raw.refresh_token,
            refresh_token_expiry: raw.refresh_token_expiry,
            established_at: raw.established_at,
            extra: raw.extra,
        };
        state.validate()?;
        Ok(state)
    }
}

impl AuthenticationState {
    /// Create a state holding only an access token.
    ///
    /// # Errors
    ///
    /// Returns an error if `token` is empty.
    pub fn new(token: impl Into<String>) -> Result<Self, Error> {
        let state = Self {
            token: token.into(),
            token_expiry: None,
            refresh_token: None,
            refresh_token_expiry: None,
            established_at: None,
            extra: Map::new(),
        };
        state.validate()?;
        Ok(state)
    }

    /// Set the access token expiry.
    pub fn with_token_expiry(mut self, expiry: Option<i64>) -> Self {
        self.token_expiry = expiry;
        self
    }

    /// Set the refresh token and its expiry.
    pub fn with_refresh_token(mut self, token: impl Into<String>, expiry: Option<i64>) -> Self {
        self.refresh_token = Some(token.into());
        self.refresh_token_expiry = expiry;
        self
    }

    /// Set the establishment time.
    pub fn with_established_at(mut self, at: i64) -> Self {
        self.established_at = Some(at);
        self
    }

    /// Check the state invariant.
    pub fn validate(&self) -> Result<(), Error> {
        if self.token.is_empty() {
            return Err(InvalidInputError::EmptyToken.into());
        }
        Ok(())
    }

    pub fn is_token_expired_at(&self, now: i64) -> bool {
        self.token_expiry.is_some_and(|exp| exp <= now)
    }

    /// A missing refresh token counts as expired.
    pub fn is_refresh_token_expired_at(&self, now: i64) -> bool {
        match self.refresh_token.as_deref() {
            None | Some("") => true,
            Some(_) => self.refresh_token_expiry.is_some_and(|exp| exp <= now),
        }
    }

    /// Credentials are expired only when neither token is usable.
    pub fn is_credentials_expired_at(&self, now: i64) -> bool {
        self.is_token_expired_at(now) && self.is_refresh_token_expired_at(now)
    }

    /// Returns the establishment time as a date.
    pub fn authentication_date(&self) -> Option<DateTime<Utc>> {
        self.established_at
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }
}

impl fmt::Debug for AuthenticationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationState")
            .field("token", &"[REDACTED]")
            .field("token_expiry", &self.token_expiry)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("refresh_token_expiry", &self.refresh_token_expiry)
            .field("established_at", &self.established_at)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn rejects_empty_token() {
        assert!(AuthenticationState::new("").is_err());
        assert!(serde_json::from_value::<AuthenticationState>(json!({"token": ""})).is_err());
    }

    #[test]
    fn missing_expiry_never_expires() {
        let state = AuthenticationState::new("t").unwrap();
        assert!(!state.is_token_expired_at(i64::MAX));
    }

    #[test]
    fn expiry_is_inclusive() {
        let state = AuthenticationState::new("t")
            .unwrap()
            .with_token_expiry(Some(NOW))
            .with_refresh_token("r", Some(NOW + 1));

        assert!(state.is_token_expired_at(NOW));
        assert!(!state.is_refresh_token_expired_at(NOW));
        assert!(state.is_refresh_token_expired_at(NOW + 1));
    }

    #[test]
    fn credentials_expired_requires_both() {
        let access_only = AuthenticationState::new("t")
            .unwrap()
            .with_token_expiry(Some(NOW - 1));
        assert!(access_only.is_credentials_expired_at(NOW));

        let refreshable = access_only.clone().with_refresh_token("r", None);
        assert!(!refreshable.is_credentials_expired_at(NOW));

        let valid_access = AuthenticationState::new("t")
            .unwrap()
            .with_token_expiry(Some(NOW + 60));
        assert!(!valid_access.is_credentials_expired_at(NOW));
    }

    #[test]
    fn serializes_compactly() {
        let state = AuthenticationState::new("t")
            .unwrap()
            .with_token_expiry(Some(NOW))
            .with_established_at(NOW);

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(
            value,
            json!({"token": "t", "token_expiry": NOW, "established_at": NOW})
        );
        assert_eq!(
            serde_json::from_value::<AuthenticationState>(value).unwrap(),
            state
        );
    }

    #[test]
    fn authentication_date_from_timestamp() {
        let state = AuthenticationState::new("t").unwrap().with_established_at(NOW);
        assert_eq!(state.authentication_date().unwrap().timestamp(), NOW);
        assert!(AuthenticationState::new("t").unwrap().authentication_date().is_none());
    }

    #[test]
    fn debug_hides_tokens() {
        let state = AuthenticationState::new("secret-access")
            .unwrap()
            .with_refresh_token("secret-refresh", None);
        let debug = format!("{:?}", state);
        assert!(!debug.contains("secret"));
    }
}
