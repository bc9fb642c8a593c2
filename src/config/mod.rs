//! # Configuration
//!
//! Handshake configuration. The core never reads the environment itself: a
//! [`BridgeConfig`] is assembled by the caller (the CLI merges flags,
//! environment variables and `.env` files) and passed in by reference.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

use crate::errors::Result;

/// Header bound into the STS signature to pin a proof to one Vault server.
pub const SERVER_ID_HEADER: &str = "X-Vault-AWS-IAM-Server-ID";

/// Global STS endpoint. Vault's AWS auth method defaults to it as well.
pub const DEFAULT_STS_ENDPOINT: &str = "https://sts.amazonaws.com";

/// Region used to sign requests for the global STS endpoint.
pub const DEFAULT_STS_REGION: &str = "us-east-1";

/// KV v2 mount the secret is read from when none is configured.
pub const DEFAULT_SECRET_MOUNT: &str = "secret";

/// Configuration for one handshake + secret read.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BridgeConfig {
    /// Vault address, e.g. `http://127.0.0.1:8200`
    #[validate(length(min = 1, message = "store address must not be empty"))]
    pub store_address: String,

    /// Mount name of the AWS auth method (`auth/<provider>/login`)
    #[validate(length(min = 1, message = "auth provider must not be empty"))]
    pub auth_provider: String,

    /// Vault role to log in as
    #[validate(length(min = 1, message = "auth role must not be empty"))]
    pub auth_role: String,

    /// Value for the anti-relay header; `None` or empty disables it
    #[serde(default)]
    pub auth_header: Option<String>,

    #[serde(default)]
    pub sts: StsConfig,

    /// Vault Enterprise namespace
    #[serde(default)]
    pub namespace: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    #[validate(range(min = 1, message = "request timeout must be at least 1 second"))]
    pub request_timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

/// Where and how the identity proof is signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct StsConfig {
    #[validate(length(min = 1, message = "STS region must not be empty"))]
    pub region: String,

    #[validate(url(message = "STS endpoint must be a valid URL"))]
    pub endpoint: String,
}

impl Default for StsConfig {
    fn default() -> Self {
        Self { region: DEFAULT_STS_REGION.to_string(), endpoint: DEFAULT_STS_ENDPOINT.to_string() }
    }
}

impl BridgeConfig {
    pub fn new(
        store_address: impl Into<String>,
        auth_provider: impl Into<String>,
        auth_role: impl Into<String>,
    ) -> Self {
        Self {
            store_address: store_address.into(),
            auth_provider: auth_provider.into(),
            auth_role: auth_role.into(),
            auth_header: None,
            sts: StsConfig::default(),
            namespace: None,
            request_timeout_secs: default_timeout_secs(),
        }
    }

    pub fn with_auth_header(mut self, value: impl Into<String>) -> Self {
        self.auth_header = Some(value.into());
        self
    }

    pub fn with_sts(mut self, sts: StsConfig) -> Self {
        self.sts = sts;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_secs = timeout.as_secs();
        self
    }

    /// Check the fields required before any network call is made.
    ///
    /// Fails with [`BridgeError::Configuration`](crate::BridgeError::Configuration)
    /// naming every empty field.
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self)?;
        Validate::validate(&self.sts)?;
        Ok(())
    }

    /// Anti-relay header value, if one is configured and non-empty.
    pub fn server_id(&self) -> Option<&str> {
        self.auth_header.as_deref().filter(|v| !v.is_empty())
    }

    /// Store address without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.store_address.trim_end_matches('/')
    }

    /// Logical login path, `auth/<provider>/login`.
    pub fn login_path(&self) -> String {
        format!("auth/{}/login", self.auth_provider)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Location of the secret to read after login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretPath {
    /// KV v2 mount (defaults to `secret`)
    #[serde(default = "default_mount")]
    pub mount: String,

    /// Path below `<mount>/data/`
    pub path: String,
}

fn default_mount() -> String {
    DEFAULT_SECRET_MOUNT.to_string()
}

impl SecretPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self { mount: default_mount(), path: path.into() }
    }

    pub fn with_mount(mut self, mount: impl Into<String>) -> Self {
        self.mount = mount.into();
        self
    }

    /// Logical read path, `<mount>/data/<path>`.
    pub fn full_path(&self) -> String {
        format!(
            "{}/data/{}",
            self.mount.trim_matches('/'),
            self.path.trim_start_matches('/')
        )
    }
}
