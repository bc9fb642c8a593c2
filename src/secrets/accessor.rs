//! Reads a KV v2 secret with the token held by a [`Session`].

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info};

use super::types::SecretPayload;
use crate::config::SecretPath;
use crate::errors::{BridgeError, Result, TransportError};
use crate::session::Session;
use crate::store::StoreClient;

#[derive(Debug, Clone)]
pub struct SecretAccessor {
    store: StoreClient,
}

impl SecretAccessor {
    pub fn new(store: StoreClient) -> Self {
        Self { store }
    }

    /// Read `path` using the session's active token.
    ///
    /// No request is sent unless the session holds a token that is still
    /// valid at `now`. The `data` field of the response is returned as is.
    pub async fn read(
        &self,
        session: &Session,
        path: &SecretPath,
        now: DateTime<Utc>,
    ) -> Result<SecretPayload> {
        let token = session.current(now)?;
        let full_path = path.full_path();

        info!(path = %full_path, "Reading secret");

        let response = self
            .store
            .read(&full_path, token.token())
            .await
            .map_err(|e| BridgeError::read(&full_path, e))?;

        let payload = match response {
            Some(Value::Object(mut body)) => match body.remove("data") {
                Some(Value::Object(data)) => SecretPayload::new(data),
                Some(other) => {
                    return Err(BridgeError::read(
                        &full_path,
                        TransportError::Decode(format!("expected 'data' to be an object, got {}", other)),
                    ))
                }
                None => {
                    return Err(BridgeError::read(
                        &full_path,
                        TransportError::Decode("response has no 'data' field".to_string()),
                    ))
                }
            },
            _ => {
                return Err(BridgeError::read(
                    &full_path,
                    TransportError::Decode("empty response".to_string()),
                ))
            }
        };

        debug!(path = %full_path, keys = payload.len(), "Secret read");
        Ok(payload)
    }
}
