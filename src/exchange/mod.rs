//! # Credential Exchange
//!
//! Transcodes an [`IdentityProof`] into the login payload of the store's AWS
//! auth method and submits it to `auth/<provider>/login`.
//!
//! The payload layout is a wire contract with the store's login handler:
//!
//! | field | encoding |
//! |---|---|
//! | `iam_http_request_method` | plain string |
//! | `iam_request_url` | base64(url) |
//! | `iam_request_headers` | base64(JSON `{"Name": ["value", ...]}`) |
//! | `iam_request_body` | base64(raw body) |
//! | `role` | plain string |

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::BridgeConfig;
use crate::errors::{BridgeError, Result};
use crate::identity::IdentityProof;
use crate::store::StoreClient;

/// JSON body of `POST auth/<provider>/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginPayload {
    pub iam_http_request_method: String,
    pub iam_request_url: String,
    pub iam_request_headers: String,
    pub iam_request_body: String,
    pub role: String,
}

impl LoginPayload {
    pub fn from_proof(proof: &IdentityProof, role: &str) -> Result<Self> {
        let headers = serde_json::to_vec(&proof.header_map()?)
            .map_err(|e| BridgeError::signing(format!("failed to encode signed headers: {}", e)))?;

        Ok(Self {
            iam_http_request_method: proof.method().as_str().to_string(),
            iam_request_url: STANDARD.encode(proof.url().as_str()),
            iam_request_headers: STANDARD.encode(headers),
            iam_request_body: STANDARD.encode(proof.body()),
            role: role.to_string(),
        })
    }
}

/// Provider response of a successful login.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginResponse(Value);

impl LoginResponse {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        self.0.pointer(pointer)
    }
}

/// Performs the login exchange against one store.
#[derive(Debug, Clone)]
pub struct CredentialExchange {
    store: StoreClient,
}

impl CredentialExchange {
    pub fn new(store: StoreClient) -> Self {
        Self { store }
    }

    /// Exchange `proof` for a provider response.
    ///
    /// Configuration is checked before anything goes on the wire. A transport
    /// failure or non-2xx answer is an [`BridgeError::Exchange`]; a 2xx answer
    /// without a JSON object is an [`BridgeError::EmptyResponse`]. Nothing is
    /// retried.
    pub async fn login(&self, config: &BridgeConfig, proof: &IdentityProof) -> Result<LoginResponse> {
        config.validate()?;

        let payload = LoginPayload::from_proof(proof, &config.auth_role)?;
        let login_path = config.login_path();

        tracing::info!(
            provider = %config.auth_provider,
            role = %config.auth_role,
            path = %login_path,
            "Calling Vault with identity from STS service"
        );

        let response = self
            .store
            .write(&login_path, &payload)
            .await
            .map_err(|e| BridgeError::exchange(&config.auth_provider, e))?;

        match response {
            Some(value) => Ok(LoginResponse::new(value)),
            None => {
                tracing::warn!(provider = %config.auth_provider, "Login returned an empty response");
                Err(BridgeError::empty_response(&config.auth_provider))
            }
        }
    }
}
