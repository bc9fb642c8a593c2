//! # Identity Proof
//!
//! Builds a SigV4-signed STS `GetCallerIdentity` request without sending it.
//! The secret store forwards the request to STS itself and trusts whatever
//! identity STS reports back, so the proof must be complete and immutable
//! once signed.
//!
//! The anti-relay header (`X-Vault-AWS-IAM-Server-ID`) is inserted before
//! signing so the signature covers it; a captured proof cannot be replayed
//! against a store that expects a different value.

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Body, Method, Request, Url};
use std::collections::BTreeMap;

use crate::aws::credentials::{AwsCredentials, CredentialsProvider};
use crate::aws::sigv4::{self, SigningParams};
use crate::config::{BridgeConfig, StsConfig, SERVER_ID_HEADER};
use crate::errors::{BridgeError, Result};

/// Form body of the STS call.
pub const GET_CALLER_IDENTITY_BODY: &str = "Action=GetCallerIdentity&Version=2011-06-15";

/// Content type STS expects for query-protocol calls.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

/// Signing service name of STS.
pub const STS_SERVICE: &str = "sts";

/// A signed, fully materialized STS request.
#[derive(Debug, Clone)]
pub struct IdentityProof {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl IdentityProof {
    /// Materialize a signed request.
    ///
    /// Fails with [`BridgeError::BodyRead`] when the body is a stream, since
    /// it could not be read again by the login payload encoder.
    pub fn from_request(request: Request) -> Result<Self> {
        let body = buffered_body(&request)?;

        Ok(Self {
            method: request.method().clone(),
            url: request.url().clone(),
            headers: request.headers().clone(),
            body,
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Value of the anti-relay header, if the proof carries one.
    pub fn server_id(&self) -> Option<&str> {
        self.headers.get(SERVER_ID_HEADER).and_then(|v| v.to_str().ok())
    }

    /// Header set keyed by canonical MIME name (`X-Amz-Date`), each mapping
    /// to every value sent for it. This is the JSON shape the store's AWS
    /// login handler decodes.
    pub fn header_map(&self) -> Result<BTreeMap<String, Vec<String>>> {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in self.headers.iter() {
            let value = value.to_str().map_err(|e| {
                BridgeError::signing(format!("header '{}' is not valid text: {}", name, e))
            })?;
            map.entry(canonical_header_key(name.as_str())).or_default().push(value.to_string());
        }
        Ok(map)
    }

    /// Check the signature against a credential set.
    pub fn verify(&self, credentials: &AwsCredentials) -> bool {
        sigv4::verify(&self.method, &self.url, &self.headers, &self.body, credentials)
    }
}

/// `x-vault-aws-iam-server-id` → `X-Vault-Aws-Iam-Server-Id`.
pub fn canonical_header_key(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Builds identity proofs from the STS settings and anti-relay header of a
/// [`BridgeConfig`].
#[derive(Debug, Clone)]
pub struct IdentityProofBuilder {
    sts: StsConfig,
    server_id: Option<String>,
}

impl IdentityProofBuilder {
    pub fn new(config: &BridgeConfig) -> Self {
        Self { sts: config.sts.clone(), server_id: config.server_id().map(str::to_string) }
    }

    /// Resolve credentials and build a proof signed at `now`.
    pub async fn build(
        &self,
        credentials: &dyn CredentialsProvider,
        now: DateTime<Utc>,
    ) -> Result<IdentityProof> {
        tracing::info!(
            endpoint = %self.sts.endpoint,
            region = %self.sts.region,
            server_id = ?self.server_id,
            "Building STS GetCallerIdentity identity proof"
        );

        let credentials = credentials.provide_credentials().await?;
        self.build_with(&credentials, now)
    }

    /// Build a proof signed with the given credentials at `now`.
    pub fn build_with(&self, credentials: &AwsCredentials, now: DateTime<Utc>) -> Result<IdentityProof> {
        let mut request = self.unsigned_request()?;
        let body = buffered_body(&request)?;

        let params = SigningParams {
            credentials,
            region: &self.sts.region,
            service: STS_SERVICE,
            time: now,
        };
        let method = request.method().clone();
        let url = request.url().clone();
        sigv4::sign(&method, &url, request.headers_mut(), &body, &params)?;

        IdentityProof::from_request(request)
    }

    /// The GetCallerIdentity request with the anti-relay header, not yet signed.
    fn unsigned_request(&self) -> Result<Request> {
        let url = sts_url(&self.sts.endpoint)?;
        let mut request = Request::new(Method::POST, url);
        request.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));

        if let Some(server_id) = &self.server_id {
            let value = HeaderValue::from_str(server_id).map_err(|e| {
                BridgeError::signing(format!("invalid {} value: {}", SERVER_ID_HEADER, e))
            })?;
            request.headers_mut().insert(HeaderName::from_static("x-vault-aws-iam-server-id"), value);
        }

        *request.body_mut() = Some(Body::from(GET_CALLER_IDENTITY_BODY));
        Ok(request)
    }
}

fn sts_url(endpoint: &str) -> Result<Url> {
    let mut url = Url::parse(endpoint)
        .map_err(|e| BridgeError::signing(format!("invalid STS endpoint '{}': {}", endpoint, e)))?;
    if url.path().is_empty() {
        url.set_path("/");
    }
    Ok(url)
}

fn buffered_body(request: &Request) -> Result<Vec<u8>> {
    match request.body() {
        None => Ok(Vec::new()),
        Some(body) => body
            .as_bytes()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| BridgeError::body_read("request body is streamed and cannot be buffered")),
    }
}
