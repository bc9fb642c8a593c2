//! # Token Lifecycle
//!
//! Parses a login response into a [`SessionToken`] and holds the active
//! token in an explicit [`Session`] owned by the calling flow.
//!
//! The token value, renewability and TTL are extracted independently and the
//! token is only built once all three succeed, so a malformed response never
//! leaves a half-initialised credential behind.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use crate::errors::{BridgeError, Result, TokenField};
use crate::exchange::LoginResponse;
use crate::secrets::SecretString;

/// A store token together with its validity window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    token: SecretString,
    renewable: bool,
    ttl: Duration,
    issued_at: DateTime<Utc>,
    expiration: DateTime<Utc>,
    accessor: Option<String>,
    policies: Vec<String>,
}

impl SessionToken {
    /// Parse `response`, anchoring the validity window at `now`.
    ///
    /// `now` is read once by the caller; expiration is `now + ttl` and is
    /// never recomputed.
    pub fn parse(response: &LoginResponse, now: DateTime<Utc>) -> Result<Self> {
        let value = response.as_value();

        let token = extract_token(value)?;
        let renewable = extract_renewable(value)?;
        let ttl = extract_ttl(value)?;

        let accessor = lookup(value, "/auth/accessor", "/data/accessor")
            .and_then(Value::as_str)
            .map(str::to_string);
        let policies = lookup(value, "/auth/policies", "/data/policies")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(|p| p.as_str().map(String::from)).collect())
            .unwrap_or_default();

        let expiration = now
            .checked_add_signed(ttl)
            .ok_or_else(|| BridgeError::token_parse(TokenField::Ttl, format!("expiration after {} is out of range", now)))?;

        Ok(Self {
            token,
            renewable,
            ttl,
            issued_at: now,
            expiration,
            accessor,
            policies,
        })
    }

    pub fn token(&self) -> &SecretString {
        &self.token
    }

    pub fn is_renewable(&self) -> bool {
        self.renewable
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expiration(&self) -> DateTime<Utc> {
        self.expiration
    }

    pub fn accessor(&self) -> Option<&str> {
        self.accessor.as_deref()
    }

    pub fn policies(&self) -> &[String] {
        &self.policies
    }

    /// `expiration > now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration > now
    }

    /// Time left before expiration; zero once expired.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.expiration - now).max(Duration::zero())
    }

    /// Whether the token still has more than `expiration_window` left, i.e.
    /// enough time to finish a request started at `now`.
    pub fn usable_at(&self, now: DateTime<Utc>, expiration_window: Duration) -> bool {
        self.remaining(now) > expiration_window
    }

    /// Whether a renewable token has entered the last `renewal_window` of
    /// its lifetime.
    pub fn renewal_due(&self, now: DateTime<Utc>, renewal_window: Duration) -> bool {
        self.renewable && self.remaining(now) <= renewal_window
    }
}

fn lookup<'a>(value: &'a Value, auth_pointer: &str, data_pointer: &str) -> Option<&'a Value> {
    value
        .pointer(auth_pointer)
        .filter(|v| !v.is_null())
        .or_else(|| value.pointer(data_pointer).filter(|v| !v.is_null()))
}

/// `auth.client_token`, falling back to `data.id` when it is absent or empty.
fn extract_token(value: &Value) -> Result<SecretString> {
    let mut saw_empty = false;
    for pointer in ["/auth/client_token", "/data/id"] {
        match value.pointer(pointer) {
            None | Some(Value::Null) => {}
            Some(Value::String(s)) if s.is_empty() => saw_empty = true,
            Some(Value::String(s)) => return Ok(SecretString::new(s.as_str())),
            Some(_) => return Err(BridgeError::token_parse(TokenField::Token, "expected a string")),
        }
    }

    let reason = if saw_empty { "token is empty" } else { "field is missing" };
    Err(BridgeError::token_parse(TokenField::Token, reason))
}

fn extract_renewable(value: &Value) -> Result<bool> {
    let field = lookup(value, "/auth/renewable", "/data/renewable")
        .ok_or_else(|| BridgeError::token_parse(TokenField::Renewable, "field is missing"))?;
    field
        .as_bool()
        .ok_or_else(|| BridgeError::token_parse(TokenField::Renewable, format!("expected a boolean, got {}", field)))
}

/// Seconds as a JSON number, or a numeric string as some endpoints return.
fn extract_ttl(value: &Value) -> Result<Duration> {
    let field = lookup(value, "/auth/lease_duration", "/data/ttl")
        .ok_or_else(|| BridgeError::token_parse(TokenField::Ttl, "field is missing"))?;
    let seconds = match field {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| BridgeError::token_parse(TokenField::Ttl, format!("expected whole seconds, got {}", field)))?;

    if seconds < 0 {
        return Err(BridgeError::token_parse(TokenField::Ttl, format!("negative ttl {}", seconds)));
    }
    Duration::try_seconds(seconds)
        .ok_or_else(|| BridgeError::token_parse(TokenField::Ttl, format!("ttl {} out of range", seconds)))
}

/// Session state of one flow: at most one active token.
#[derive(Debug, Default)]
pub struct Session {
    active: Option<SessionToken>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `response` and, only if that succeeds, make it the active token.
    pub fn establish(&mut self, response: &LoginResponse, now: DateTime<Utc>) -> Result<&SessionToken> {
        let token = SessionToken::parse(response, now)?;
        tracing::info!(
            renewable = token.is_renewable(),
            ttl_secs = token.ttl().num_seconds(),
            expiration = %token.expiration(),
            "Obtained Vault token"
        );
        Ok(&*self.active.insert(token))
    }

    pub fn clear(&mut self) {
        self.active = None;
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn token(&self) -> Option<&SessionToken> {
        self.active.as_ref()
    }

    /// The active token if it is still valid at `now`.
    pub fn current(&self, now: DateTime<Utc>) -> Result<&SessionToken> {
        let token = self.active.as_ref().ok_or(BridgeError::NoActiveSession)?;
        if !token.is_valid_at(now) {
            return Err(BridgeError::SessionExpired { expired_at: token.expiration() });
        }
        Ok(token)
    }
}
