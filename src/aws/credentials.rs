//! AWS credentials and the provider seam used by the identity proof builder.
//!
//! The core only asks a [`CredentialsProvider`] for a ready-made
//! [`AwsCredentials`] value. [`DefaultChainCredentials`] delegates the
//! resolution itself (profiles, IMDS, SSO, ...) to the AWS SDK.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_credential_types::Credentials;
use std::fmt;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::errors::{BridgeError, Result};
use crate::secrets::SecretString;

/// An AWS access key pair, optionally with a session token for temporary
/// (STS-issued) credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    access_key_id: String,
    secret_access_key: SecretString,
    session_token: Option<SecretString>,
}

impl AwsCredentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<SecretString>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    pub fn with_session_token(mut self, token: impl Into<SecretString>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_access_key(&self) -> &SecretString {
        &self.secret_access_key
    }

    pub fn session_token(&self) -> Option<&SecretString> {
        self.session_token.as_ref()
    }
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &self.secret_access_key)
            .field("session_token", &self.session_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Supplies credentials for signing the identity proof.
///
/// Implementations must be `Send + Sync` so a provider can be shared behind
/// an `Arc` by callers that run several flows.
#[async_trait]
pub trait CredentialsProvider: Send + Sync {
    /// Resolve credentials. Failures surface as [`BridgeError::Signing`].
    async fn provide_credentials(&self) -> Result<AwsCredentials>;
}

/// Always hands out the same credentials.
#[derive(Debug, Clone)]
pub struct StaticCredentials(AwsCredentials);

impl StaticCredentials {
    pub fn new(credentials: AwsCredentials) -> Self {
        Self(credentials)
    }
}

#[async_trait]
impl CredentialsProvider for StaticCredentials {
    async fn provide_credentials(&self) -> Result<AwsCredentials> {
        Ok(self.0.clone())
    }
}

/// Resolves credentials through the AWS SDK default chain: environment,
/// shared config/credentials files, web identity, ECS and EC2 instance
/// metadata, in that order.
///
/// The SDK configuration is loaded on first use and its provider reused, so
/// refreshable credentials (instance roles, SSO) keep their cache.
#[derive(Debug, Default)]
pub struct DefaultChainCredentials {
    provider: OnceCell<SharedCredentialsProvider>,
}

impl DefaultChainCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an already-built SDK provider instead of loading the default chain.
    pub fn from_provider(provider: impl ProvideCredentials + 'static) -> Self {
        Self { provider: OnceCell::new_with(Some(SharedCredentialsProvider::new(provider))) }
    }

    async fn provider(&self) -> Result<&SharedCredentialsProvider> {
        self.provider
            .get_or_try_init(|| async {
                let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
                config
                    .credentials_provider()
                    .ok_or_else(|| BridgeError::signing("AWS SDK configuration has no credentials provider"))
            })
            .await
    }
}

#[async_trait]
impl CredentialsProvider for DefaultChainCredentials {
    async fn provide_credentials(&self) -> Result<AwsCredentials> {
        let provider = self.provider().await?;
        let credentials = ProvideCredentials::provide_credentials(provider)
            .await
            .map_err(|e| BridgeError::signing(format!("no AWS credentials: {}", e)))?;

        debug!(access_key_id = %credentials.access_key_id(), "Resolved AWS credentials");
        Ok(AwsCredentials::from(&credentials))
    }
}

impl From<&Credentials> for AwsCredentials {
    fn from(credentials: &Credentials) -> Self {
        let mut mapped = AwsCredentials::new(credentials.access_key_id(), credentials.secret_access_key());
        if let Some(token) = credentials.session_token() {
            mapped = mapped.with_session_token(token);
        }
        mapped
    }
}
