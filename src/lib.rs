//! # vaultbridge
//!
//! Logs in to HashiCorp Vault with an AWS identity and reads one secret.
//!
//! The workload never holds a static Vault credential. Instead it signs an
//! STS `GetCallerIdentity` request with its AWS credentials and hands the
//! signed request to Vault's AWS auth method, which replays it against STS
//! and issues a short-lived token for whatever identity STS reports.
//!
//! ## Architecture
//!
//! ```text
//! IdentityProofBuilder → CredentialExchange → Session → SecretAccessor
//!   (SigV4 signing)        (auth/<p>/login)    (token)    (secret/data/<path>)
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vaultbridge::{BridgeConfig, DefaultChainCredentials, HandshakeFlow, Result, SecretPath};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = BridgeConfig::new("http://127.0.0.1:8200", "aws", "example-role-name")
//!         .with_auth_header("vault.example.com");
//!     let mut flow = HandshakeFlow::new(config, Arc::new(DefaultChainCredentials::new()))?;
//!     let secret = flow.run(&SecretPath::new("data/foo")).await?;
//!     println!("{} keys", secret.len());
//!     Ok(())
//! }
//! ```

pub mod aws;
pub mod cli;
pub mod config;
pub mod errors;
pub mod exchange;
pub mod flow;
pub mod identity;
pub mod observability;
pub mod secrets;
pub mod session;
pub mod store;

// Re-export commonly used types and traits
pub use aws::{AwsCredentials, CredentialsProvider, DefaultChainCredentials, StaticCredentials};
pub use config::{BridgeConfig, SecretPath, StsConfig};
pub use errors::{BridgeError, Result, TokenField, TransportError};
pub use flow::HandshakeFlow;
pub use identity::{IdentityProof, IdentityProofBuilder};
pub use secrets::{SecretPayload, SecretString};
pub use session::{Session, SessionToken};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
