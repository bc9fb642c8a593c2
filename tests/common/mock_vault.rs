use std::collections::BTreeMap;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};
use serde_json::{json, Value};
use vaultbridge::aws::sigv4;
use vaultbridge::exchange::LoginPayload;
use vaultbridge::{AwsCredentials, CredentialsProvider, StaticCredentials};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const ACCESS_KEY_ID: &str = "AKIDEXAMPLE";
pub const SECRET_ACCESS_KEY: &str = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY";
pub const CLIENT_TOKEN: &str = "hvs.CAESIJlZ1rQ4x2";
pub const SERVER_ID: &str = "vault.example.com";
pub const ROLE: &str = "example-role-name";

pub fn aws_credentials() -> AwsCredentials {
    AwsCredentials::new(ACCESS_KEY_ID, SECRET_ACCESS_KEY)
}

pub fn credentials() -> Arc<dyn CredentialsProvider> {
    Arc::new(StaticCredentials::new(aws_credentials()))
}

/// Login response as returned by the AWS auth method.
pub fn login_body(ttl: Value) -> Value {
    json!({
        "request_id": "2b6c6c52-1f5e-4c2b-9c57-2a1bd42a1c6b",
        "lease_id": "",
        "renewable": false,
        "lease_duration": 0,
        "data": null,
        "auth": {
            "client_token": CLIENT_TOKEN,
            "accessor": "0e9e354a-520f-df04-6867-ee81cae3d42d",
            "policies": ["default", "app-read"],
            "token_policies": ["default", "app-read"],
            "metadata": {"account_id": "123456789012", "role_id": "e3c8f0f9"},
            "lease_duration": ttl,
            "renewable": true
        }
    })
}

/// The STS request carried inside a login payload.
#[derive(Debug)]
pub struct DecodedProof {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub role: String,
}

impl DecodedProof {
    pub fn decode(payload: &LoginPayload) -> Result<Self, String> {
        let method = Method::from_bytes(payload.iam_http_request_method.as_bytes())
            .map_err(|e| e.to_string())?;
        let url = String::from_utf8(STANDARD.decode(&payload.iam_request_url).map_err(|e| e.to_string())?)
            .map_err(|e| e.to_string())?;
        let url = Url::parse(&url).map_err(|e| e.to_string())?;

        let header_json = STANDARD.decode(&payload.iam_request_headers).map_err(|e| e.to_string())?;
        let header_map: BTreeMap<String, Vec<String>> =
            serde_json::from_slice(&header_json).map_err(|e| e.to_string())?;
        let mut headers = HeaderMap::new();
        for (name, values) in header_map {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| e.to_string())?;
            for value in values {
                headers.append(name.clone(), HeaderValue::from_str(&value).map_err(|e| e.to_string())?);
            }
        }

        let body = STANDARD.decode(&payload.iam_request_body).map_err(|e| e.to_string())?;

        Ok(Self { method, url, headers, body, role: payload.role.clone() })
    }

    pub fn server_id(&self) -> Option<&str> {
        self.headers.get("x-vault-aws-iam-server-id").and_then(|v| v.to_str().ok())
    }

    pub fn verify(&self, credentials: &AwsCredentials) -> bool {
        sigv4::verify(&self.method, &self.url, &self.headers, &self.body, credentials)
    }
}

/// Responds like the AWS auth method's login handler.
pub struct LoginHandler {
    pub expected_server_id: Option<String>,
    pub role: String,
    pub response: Value,
}

impl LoginHandler {
    fn reject(reason: impl Into<String>) -> ResponseTemplate {
        ResponseTemplate::new(400).set_body_json(json!({ "errors": [reason.into()] }))
    }
}

impl Respond for LoginHandler {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let payload: LoginPayload = match serde_json::from_slice(&request.body) {
            Ok(payload) => payload,
            Err(e) => return Self::reject(format!("invalid login payload: {}", e)),
        };
        let proof = match DecodedProof::decode(&payload) {
            Ok(proof) => proof,
            Err(e) => return Self::reject(format!("invalid identity proof: {}", e)),
        };

        if proof.role != self.role {
            return Self::reject(format!("entry for role {} not found", proof.role));
        }
        if let Some(expected) = &self.expected_server_id {
            if proof.server_id() != Some(expected.as_str()) {
                return Self::reject("expected X-Vault-AWS-IAM-Server-ID header value mismatch");
            }
        }
        if !proof.verify(&aws_credentials()) {
            return ResponseTemplate::new(403)
                .set_body_json(json!({ "errors": ["SignatureDoesNotMatch"] }));
        }

        ResponseTemplate::new(200).set_body_json(self.response.clone())
    }
}

/// Mount a login endpoint under `auth/<provider>/login`.
pub async fn mount_login(server: &MockServer, provider: &str, handler: LoginHandler) {
    Mock::given(method("POST"))
        .and(path(format!("/v1/auth/{}/login", provider)))
        .respond_with(handler)
        .expect(1)
        .mount(server)
        .await;
}

/// Mount a KV v2 read that only answers to [`CLIENT_TOKEN`].
pub async fn mount_secret(server: &MockServer, full_path: &str, data: Value, hits: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/v1/{}", full_path)))
        .and(header("X-Vault-Token", CLIENT_TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "request_id": "8c3f5d9e-0c7a-4b52-a7b5-4a86e8d0a4a1",
            "lease_id": "",
            "renewable": false,
            "lease_duration": 0,
            "data": data,
            "wrap_info": null,
            "warnings": null,
            "auth": null
        })))
        .expect(hits)
        .mount(server)
        .await;
}
