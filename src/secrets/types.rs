//! Value types for secret material.
//!
//! [`SecretString`] wraps Vault client tokens and AWS secret keys so they
//! never reach logs, `Debug` output or serialized diagnostics. [`SecretPayload`]
//! is the key/value mapping returned by a secret read.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A string wrapper that redacts its contents in Debug, Display and serialization.
///
/// Vault client tokens, AWS secret access keys and AWS session tokens all
/// travel through the handshake as `SecretString`, so a `tracing` field or an
/// error message built from one of them never carries the real value.
///
/// # Security
///
/// - Debug output shows `SecretString([REDACTED])`
/// - Display output shows `[REDACTED]`
/// - Serialization outputs `"[REDACTED]"`, never the value
/// - Deserialization accepts the real value (login responses, config files)
/// - **Memory is zeroed when dropped** (via the `zeroize` crate)
///
/// # Example
///
/// ```rust
/// use vaultbridge::SecretString;
///
/// let token = SecretString::new("hvs.CAESIExample");
///
/// assert_eq!(format!("{:?}", token), "SecretString([REDACTED])");
/// assert_eq!(serde_json::to_string(&token).unwrap(), "\"[REDACTED]\"");
///
/// // Only where the value goes on the wire:
/// assert_eq!(token.expose_secret(), "hvs.CAESIExample");
/// ```
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
    /// Creates a new SecretString from a string value.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Exposes the underlying secret value.
    ///
    /// # Security Warning
    ///
    /// Call this only where the value is put into a request header or fed
    /// into an HMAC. Never log or print the result.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    /// Returns the length of the secret without exposing the value.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for SecretString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Never serialize the actual secret value
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretString)
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString([REDACTED])")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for SecretString {}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// The `data` object of a secret read, returned verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretPayload(Map<String, Value>);

impl SecretPayload {
    pub fn new(data: Map<String, Value>) -> Self {
        Self(data)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_vault_token_is_redacted() {
        let token = SecretString::new("hvs.CAESIJ-example");

        assert_eq!(format!("{:?}", token), "SecretString([REDACTED])");
        assert_eq!(format!("{}", token), "[REDACTED]");
        assert_eq!(serde_json::to_string(&token).unwrap(), "\"[REDACTED]\"");
        assert_eq!(token.expose_secret(), "hvs.CAESIJ-example");
    }

    #[test]
    fn test_redacted_inside_struct() {
        #[derive(Serialize)]
        struct Credentials {
            access_key_id: String,
            secret_access_key: SecretString,
        }

        let creds = Credentials {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: SecretString::new("wJalrXUtnFEMI/K7MDENG"),
        };

        let json = serde_json::to_string(&creds).unwrap();
        assert!(json.contains("AKIDEXAMPLE"));
        assert!(!json.contains("wJalrXUtnFEMI"));
    }

    #[test]
    fn test_deserialize_keeps_value() {
        let secret: SecretString = serde_json::from_str("\"s3cr3t\"").unwrap();
        assert_eq!(secret.expose_secret(), "s3cr3t");
        assert_eq!(secret.len(), 6);
        assert!(!secret.is_empty());
    }

    #[test]
    fn test_payload_serializes_as_plain_object() {
        let mut map = Map::new();
        map.insert("username".to_string(), json!("app"));
        map.insert("port".to_string(), json!(5432));
        let payload = SecretPayload::new(map);

        assert_eq!(serde_json::to_value(&payload).unwrap(), json!({"username": "app", "port": 5432}));
        assert_eq!(payload.get("port"), Some(&json!(5432)));
        assert_eq!(payload.len(), 2);
    }
}
