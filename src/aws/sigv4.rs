//! AWS Signature Version 4 request signing.
//!
//! Only what the STS identity proof needs: header-based signing of a fully
//! buffered request, and the matching verification used to check that a
//! proof has not been altered after signing.
//!
//! ```text
//! CanonicalRequest = Method \n URI \n Query \n CanonicalHeaders \n SignedHeaders \n hex(sha256(body))
//! StringToSign     = "AWS4-HMAC-SHA256" \n AmzDate \n Scope \n hex(sha256(CanonicalRequest))
//! Scope            = yyyymmdd/region/service/aws4_request
//! ```

use chrono::{DateTime, NaiveDateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Method, Url};
use sha2::{Digest, Sha256};

use crate::aws::credentials::AwsCredentials;
use crate::errors::{BridgeError, Result};

type HmacSha256 = Hmac<Sha256>;

pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";
pub const X_AMZ_DATE: &str = "x-amz-date";
pub const X_AMZ_SECURITY_TOKEN: &str = "x-amz-security-token";

const AMZ_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";
const SCOPE_DATE_FORMAT: &str = "%Y%m%d";
const TERMINATOR: &str = "aws4_request";

/// Headers that proxies rewrite; never part of a signature.
const UNSIGNED_HEADERS: &[&str] = &["authorization", "user-agent", "x-amzn-trace-id"];

/// Inputs that together with the request determine a signature.
#[derive(Debug, Clone, Copy)]
pub struct SigningParams<'a> {
    pub credentials: &'a AwsCredentials,
    pub region: &'a str,
    pub service: &'a str,
    pub time: DateTime<Utc>,
}

impl SigningParams<'_> {
    fn scope(&self) -> String {
        format!("{}/{}/{}/{}", self.time.format(SCOPE_DATE_FORMAT), self.region, self.service, TERMINATOR)
    }
}

/// Sign a request in place.
///
/// Adds `X-Amz-Date`, `X-Amz-Security-Token` (temporary credentials only) and
/// `Authorization`. Every other header already present is signed, so callers
/// must add headers that need protecting *before* calling this.
pub fn sign(
    method: &Method,
    url: &Url,
    headers: &mut HeaderMap,
    body: &[u8],
    params: &SigningParams<'_>,
) -> Result<()> {
    let amz_date = params.time.format(AMZ_DATE_FORMAT).to_string();
    headers.insert(HeaderName::from_static(X_AMZ_DATE), header_value(&amz_date)?);
    if let Some(token) = params.credentials.session_token() {
        headers.insert(HeaderName::from_static(X_AMZ_SECURITY_TOKEN), header_value(token.expose_secret())?);
    }
    headers.remove(AUTHORIZATION);

    let signed_headers = signed_header_names(headers);
    let canonical = canonical_request(method, url, headers, &signed_headers, body)
        .map_err(BridgeError::signing)?;
    let signature = compute_signature(&canonical, &amz_date, params)?;

    let authorization = format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        ALGORITHM,
        params.credentials.access_key_id(),
        params.scope(),
        signed_headers.join(";"),
        signature
    );
    headers.insert(AUTHORIZATION, header_value(&authorization)?);

    tracing::debug!(
        region = %params.region,
        service = %params.service,
        signed_headers = %signed_headers.join(";"),
        "Signed request with SigV4"
    );
    Ok(())
}

/// Recompute the signature of an already-signed request and compare it with
/// the one carried in its `Authorization` header.
///
/// Returns `false` for any malformed or mismatching input.
pub fn verify(
    method: &Method,
    url: &Url,
    headers: &HeaderMap,
    body: &[u8],
    credentials: &AwsCredentials,
) -> bool {
    let Some(auth) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let Some(parsed) = ParsedAuthorization::parse(auth) else {
        return false;
    };
    if parsed.access_key_id != credentials.access_key_id() {
        return false;
    }

    let Some(amz_date) = headers.get(X_AMZ_DATE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let Ok(time) = NaiveDateTime::parse_from_str(amz_date, AMZ_DATE_FORMAT) else {
        return false;
    };
    let time = time.and_utc();
    if time.format(SCOPE_DATE_FORMAT).to_string() != parsed.date {
        return false;
    }

    let params = SigningParams {
        credentials,
        region: &parsed.region,
        service: &parsed.service,
        time,
    };
    let Ok(canonical) = canonical_request(method, url, headers, &parsed.signed_headers, body) else {
        return false;
    };
    let Ok(signing_key) = signing_key(&params) else {
        return false;
    };
    let Ok(expected) = hex::decode(&parsed.signature) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(&signing_key) else {
        return false;
    };
    mac.update(string_to_sign(&canonical, amz_date, &params.scope()).as_bytes());
    mac.verify_slice(&expected).is_ok()
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| BridgeError::signing(format!("invalid header value: {}", e)))
}

/// Lower-case names of the headers that will be signed, sorted, `host` included.
fn signed_header_names(headers: &HeaderMap) -> Vec<String> {
    let mut names: Vec<String> = headers
        .keys()
        .map(|name| name.as_str().to_string())
        .filter(|name| !UNSIGNED_HEADERS.contains(&name.as_str()))
        .collect();
    names.push("host".to_string());
    names.sort();
    names.dedup();
    names
}

fn canonical_request(
    method: &Method,
    url: &Url,
    headers: &HeaderMap,
    signed_headers: &[String],
    body: &[u8],
) -> std::result::Result<String, String> {
    let mut canonical_headers = String::new();
    for name in signed_headers {
        let value = if name == "host" && !headers.contains_key("host") {
            host_header(url)?
        } else {
            let values = headers
                .get_all(name.as_str())
                .iter()
                .map(|v| v.to_str().map(normalize_header_value).map_err(|e| e.to_string()))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            if values.is_empty() {
                return Err(format!("signed header '{}' is missing", name));
            }
            values.join(",")
        };
        canonical_headers.push_str(name);
        canonical_headers.push(':');
        canonical_headers.push_str(&value);
        canonical_headers.push('\n');
    }

    let path = match url.path() {
        "" => "/",
        p => p,
    };

    Ok(format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method.as_str(),
        path,
        canonical_query(url),
        canonical_headers,
        signed_headers.join(";"),
        hex::encode(Sha256::digest(body))
    ))
}

fn host_header(url: &Url) -> std::result::Result<String, String> {
    let host = url.host_str().ok_or_else(|| format!("URL '{}' has no host", url))?;
    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Trim and collapse runs of spaces.
fn normalize_header_value(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn canonical_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> =
        url.query_pairs().map(|(k, v)| (uri_encode(&k), uri_encode(&v))).collect();
    pairs.sort();
    pairs.iter().map(|(k, v)| format!("{}={}", k, v)).collect::<Vec<_>>().join("&")
}

/// Percent-encode everything but the RFC 3986 unreserved characters.
fn uri_encode(input: &str) -> String {
    let mut encoded = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

fn string_to_sign(canonical_request: &str, amz_date: &str, scope: &str) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        scope,
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    )
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| BridgeError::signing(format!("invalid signing key: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn signing_key(params: &SigningParams<'_>) -> Result<Vec<u8>> {
    let secret = format!("AWS4{}", params.credentials.secret_access_key().expose_secret());
    let date = params.time.format(SCOPE_DATE_FORMAT).to_string();

    let k_date = hmac_sha256(secret.as_bytes(), date.as_bytes())?;
    let k_region = hmac_sha256(&k_date, params.region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, params.service.as_bytes())?;
    hmac_sha256(&k_service, TERMINATOR.as_bytes())
}

fn compute_signature(canonical_request: &str, amz_date: &str, params: &SigningParams<'_>) -> Result<String> {
    let key = signing_key(params)?;
    let to_sign = string_to_sign(canonical_request, amz_date, &params.scope());
    Ok(hex::encode(hmac_sha256(&key, to_sign.as_bytes())?))
}

/// Fields of `AWS4-HMAC-SHA256 Credential=.., SignedHeaders=.., Signature=..`.
#[derive(Debug, PartialEq, Eq)]
struct ParsedAuthorization {
    access_key_id: String,
    date: String,
    region: String,
    service: String,
    signed_headers: Vec<String>,
    signature: String,
}

impl ParsedAuthorization {
    fn parse(header: &str) -> Option<Self> {
        let rest = header.strip_prefix(ALGORITHM)?.trim_start();

        let mut credential = None;
        let mut signed_headers = None;
        let mut signature = None;
        for part in rest.split(',') {
            let (key, value) = part.trim().split_once('=')?;
            match key {
                "Credential" => credential = Some(value),
                "SignedHeaders" => signed_headers = Some(value),
                "Signature" => signature = Some(value),
                _ => return None,
            }
        }

        let mut scope = credential?.split('/');
        let access_key_id = scope.next()?.to_string();
        let date = scope.next()?.to_string();
        let region = scope.next()?.to_string();
        let service = scope.next()?.to_string();
        if scope.next()? != TERMINATOR || scope.next().is_some() {
            return None;
        }

        Some(Self {
            access_key_id,
            date,
            region,
            service,
            signed_headers: signed_headers?.split(';').map(str::to_string).collect(),
            signature: signature?.to_string(),
        })
    }
}
