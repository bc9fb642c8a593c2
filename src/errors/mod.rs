//! # Error Handling
//!
//! Error types for the identity-bridging handshake, built with `thiserror`.
//!
//! Every stage of the flow surfaces its failure as a [`BridgeError`] variant
//! and nothing is recovered locally. Transport-level detail (HTTP failures,
//! Vault API errors, undecodable bodies) is carried by [`TransportError`].

use std::fmt;

use chrono::{DateTime, Utc};

/// Custom result type for vaultbridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Field of a login response that the token parser extracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenField {
    /// `auth.client_token` / `data.id`
    Token,
    /// `auth.renewable` / `data.renewable`
    Renewable,
    /// `auth.lease_duration` / `data.ttl`
    Ttl,
}

impl TokenField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::Renewable => "renewable",
            Self::Ttl => "ttl",
        }
    }
}

impl fmt::Display for TokenField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure talking to the secret store.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    /// The request never produced a response (connect, TLS, timeout, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with a non-2xx status.
    #[error("store returned status {status}: {}", .errors.join(", "))]
    Api { status: u16, errors: Vec<String> },

    /// The response body could not be interpreted.
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl TransportError {
    /// HTTP status of an API error, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Decode(_) => None,
        }
    }
}

/// Main error type for the handshake and secret read.
#[derive(thiserror::Error, Debug)]
pub enum BridgeError {
    /// Missing or invalid configuration. Raised before any network call.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Credential resolution or request signing failed.
    #[error("Failed to sign identity request: {0}")]
    Signing(String),

    /// The signed request body could not be fully drained.
    #[error("Failed to read identity request body: {0}")]
    BodyRead(String),

    /// The login exchange with the store failed.
    #[error("Login with the {provider} authentication provider failed: {source}")]
    Exchange {
        provider: String,
        #[source]
        source: TransportError,
    },

    /// The store answered the login with nothing usable.
    #[error("Got no response from the {provider} authentication provider")]
    EmptyResponse { provider: String },

    /// A field of the login response could not be extracted.
    #[error("Failed to parse {field} from login response: {reason}")]
    TokenParse { field: TokenField, reason: String },

    /// A secret read was attempted without logging in first.
    #[error("No active session: log in before reading secrets")]
    NoActiveSession,

    /// The active session token is past its expiration.
    #[error("Session token expired at {expired_at}")]
    SessionExpired { expired_at: DateTime<Utc> },

    /// Reading a secret failed.
    #[error("Failed to read secret at '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: TransportError,
    },
}

impl BridgeError {
    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a new signing error
    pub fn signing<S: Into<String>>(message: S) -> Self {
        Self::Signing(message.into())
    }

    /// Create a new body read error
    pub fn body_read<S: Into<String>>(message: S) -> Self {
        Self::BodyRead(message.into())
    }

    /// Create a new exchange error for the given provider
    pub fn exchange(provider: impl Into<String>, source: TransportError) -> Self {
        Self::Exchange { provider: provider.into(), source }
    }

    /// Create a new empty response error for the given provider
    pub fn empty_response(provider: impl Into<String>) -> Self {
        Self::EmptyResponse { provider: provider.into() }
    }

    /// Create a new token parse error
    pub fn token_parse(field: TokenField, reason: impl Into<String>) -> Self {
        Self::TokenParse { field, reason: reason.into() }
    }

    /// Create a new read error for the given secret path
    pub fn read(path: impl Into<String>, source: TransportError) -> Self {
        Self::Read { path: path.into(), source }
    }
}

impl From<validator::ValidationErrors> for BridgeError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| e.message.as_ref().map_or("invalid value".to_string(), |m| m.to_string()))
                    .collect();
                format!("{}: {}", field, messages.join(", "))
            })
            .collect();
        // HashMap iteration order is unstable; keep messages deterministic.
        fields.sort();

        Self::configuration(fields.join("; "))
    }
}
