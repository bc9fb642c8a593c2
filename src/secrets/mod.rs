//! Secret material and the secret read.
//!
//! - [`SecretString`] redacts tokens and keys everywhere they might be printed
//! - [`SecretPayload`] is the key/value data of a secret
//! - [`SecretAccessor`] reads a KV v2 secret with the active session token
//!
//! # Example
//!
//! ```rust,ignore
//! use vaultbridge::config::{BridgeConfig, SecretPath};
//! use vaultbridge::secrets::SecretAccessor;
//! use vaultbridge::store::StoreClient;
//!
//! let accessor = SecretAccessor::new(StoreClient::new(&config)?);
//! let payload = accessor.read(&session, &SecretPath::new("data/foo"), chrono::Utc::now()).await?;
//! println!("{:?}", payload.keys().collect::<Vec<_>>());
//! ```

pub mod accessor;
pub mod types;

pub use accessor::SecretAccessor;
pub use types::{SecretPayload, SecretString};
