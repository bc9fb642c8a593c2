//! HTTP client for the secret store's logical API (`/v1/<path>`).
//!
//! Thin wrapper over `reqwest` that knows about Vault's conventions: the
//! `X-Vault-Token` and `X-Vault-Namespace` headers, the `{"errors": [...]}`
//! error body, and empty bodies on `204` responses.

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::config::BridgeConfig;
use crate::errors::{BridgeError, Result, TransportError};
use crate::secrets::SecretString;

pub const TOKEN_HEADER: &str = "X-Vault-Token";
pub const NAMESPACE_HEADER: &str = "X-Vault-Namespace";

/// Client bound to one store address.
#[derive(Debug, Clone)]
pub struct StoreClient {
    client: Client,
    base_url: String,
    namespace: Option<String>,
}

impl StoreClient {
    pub fn new(config: &BridgeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| BridgeError::configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            namespace: config.namespace.clone().filter(|ns| !ns.is_empty()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn with_namespace(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.namespace {
            Some(ns) => builder.header(NAMESPACE_HEADER, ns),
            None => builder,
        }
    }

    /// `POST /v1/<path>` with a JSON body, unauthenticated.
    ///
    /// Returns `Ok(None)` when the store answers 2xx without a JSON object.
    pub async fn write<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> std::result::Result<Option<Value>, TransportError> {
        let url = self.url(path);
        debug!("POST {}", url);

        let response = self.with_namespace(self.client.post(&url)).json(body).send().await?;
        handle_response(response).await
    }

    /// `GET /v1/<path>` authenticated with `token`.
    pub async fn read(
        &self,
        path: &str,
        token: &SecretString,
    ) -> std::result::Result<Option<Value>, TransportError> {
        let url = self.url(path);
        debug!("GET {}", url);

        let response = self
            .with_namespace(self.client.get(&url))
            .header(TOKEN_HEADER, token.expose_secret())
            .send()
            .await?;
        handle_response(response).await
    }
}

async fn handle_response(response: Response) -> std::result::Result<Option<Value>, TransportError> {
    let status = response.status();
    debug!("Response status: {}", status);

    if !status.is_success() {
        let errors = parse_store_errors(response).await;
        trace!(?errors, "Store returned error response");
        return Err(TransportError::Api { status: status.as_u16(), errors });
    }

    if status == StatusCode::NO_CONTENT {
        return Ok(None);
    }

    let body = response.text().await?;
    if body.trim().is_empty() {
        return Ok(None);
    }

    match serde_json::from_str::<Value>(&body) {
        Ok(Value::Object(map)) => Ok(Some(Value::Object(map))),
        Ok(Value::Null) => Ok(None),
        Ok(other) => Err(TransportError::Decode(format!("expected a JSON object, got {}", other))),
        Err(e) => Err(TransportError::Decode(e.to_string())),
    }
}

async fn parse_store_errors(response: Response) -> Vec<String> {
    response
        .json::<Value>()
        .await
        .ok()
        .and_then(|v| {
            v.get("errors")?
                .as_array()
                .map(|arr| arr.iter().filter_map(|e| e.as_str().map(String::from)).collect())
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> StoreClient {
        StoreClient::new(&BridgeConfig::new(server.uri(), "aws", "role")).unwrap()
    }

    #[tokio::test]
    async fn test_write_posts_json_under_v1() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/auth/aws/login"))
            .and(body_json(json!({"role": "r"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"auth": {}})))
            .expect(1)
            .mount(&server)
            .await;

        let value = client_for(&server).write("auth/aws/login", &json!({"role": "r"})).await.unwrap();
        assert_eq!(value, Some(json!({"auth": {}})));
    }

    #[tokio::test]
    async fn test_no_content_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let value = client_for(&server).write("auth/aws/login", &json!({})).await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_json_null_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;

        let value = client_for(&server).write("auth/aws/login", &json!({})).await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_error_body_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(403).set_body_json(json!({"errors": ["permission denied"]})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .read("secret/data/foo", &SecretString::new("hvs.bad"))
            .await
            .unwrap_err();
        match err {
            TransportError::Api { status, errors } => {
                assert_eq!(status, 403);
                assert_eq!(errors, vec!["permission denied".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_read_sends_token_and_namespace() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/secret/data/foo"))
            .and(header(TOKEN_HEADER, "hvs.good"))
            .and(header(NAMESPACE_HEADER, "team-a"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"k": "v"}})))
            .expect(1)
            .mount(&server)
            .await;

        let config = BridgeConfig::new(server.uri(), "aws", "role").with_namespace("team-a");
        let client = StoreClient::new(&config).unwrap();
        let value = client.read("secret/data/foo", &SecretString::new("hvs.good")).await.unwrap();
        assert_eq!(value, Some(json!({"data": {"k": "v"}})));
    }

    #[tokio::test]
    async fn test_non_object_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[1,2,3]"))
            .mount(&server)
            .await;

        let err = client_for(&server).read("secret/data/foo", &SecretString::new("t")).await.unwrap_err();
        assert!(matches!(err, TransportError::Decode(_)));
    }
}
