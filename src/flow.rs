//! # Handshake Flow
//!
//! Runs the four stages in order: build the identity proof, exchange it for
//! a login response, parse that into the session, read the secret. Each stage
//! runs once; the first error ends the flow.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use crate::aws::credentials::CredentialsProvider;
use crate::config::{BridgeConfig, SecretPath};
use crate::errors::Result;
use crate::exchange::CredentialExchange;
use crate::identity::IdentityProofBuilder;
use crate::secrets::{SecretAccessor, SecretPayload};
use crate::session::{Session, SessionToken};
use crate::store::StoreClient;

/// Owns the configuration and the session for one handshake.
pub struct HandshakeFlow {
    config: BridgeConfig,
    credentials: Arc<dyn CredentialsProvider>,
    proofs: IdentityProofBuilder,
    exchange: CredentialExchange,
    accessor: SecretAccessor,
    session: Session,
}

impl HandshakeFlow {
    pub fn new(config: BridgeConfig, credentials: Arc<dyn CredentialsProvider>) -> Result<Self> {
        let store = StoreClient::new(&config)?;

        Ok(Self {
            proofs: IdentityProofBuilder::new(&config),
            exchange: CredentialExchange::new(store.clone()),
            accessor: SecretAccessor::new(store),
            session: Session::new(),
            config,
            credentials,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Prove identity and establish the session.
    ///
    /// Configuration is validated before credentials are resolved, so an
    /// incomplete configuration never reaches the network.
    #[instrument(skip(self), fields(provider = %self.config.auth_provider, role = %self.config.auth_role))]
    pub async fn login(&mut self) -> Result<&SessionToken> {
        self.config.validate()?;

        let proof = self.proofs.build(self.credentials.as_ref(), Utc::now()).await?;
        let response = self.exchange.login(&self.config, &proof).await?;

        self.session.establish(&response, Utc::now())
    }

    /// Read `path` with the current session.
    #[instrument(skip(self), fields(path = %path.full_path()))]
    pub async fn read_secret(&self, path: &SecretPath) -> Result<SecretPayload> {
        self.accessor.read(&self.session, path, Utc::now()).await
    }

    /// Log in, then read `path`.
    pub async fn run(&mut self, path: &SecretPath) -> Result<SecretPayload> {
        let token = self.login().await?;
        info!(
            renewable = token.is_renewable(),
            expiration = %token.expiration(),
            "Session established"
        );
        self.read_secret(path).await
    }
}

impl std::fmt::Debug for HandshakeFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandshakeFlow")
            .field("config", &self.config)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
