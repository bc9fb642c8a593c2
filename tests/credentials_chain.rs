//! Integration tests for AWS credential resolution through the SDK chain.
//!
//! Each test starts from an environment with every credential source
//! disabled, then enables exactly one.

use std::env;
use std::io::Write;
use std::sync::Mutex;
use vaultbridge::{BridgeError, CredentialsProvider, DefaultChainCredentials};

// Use a mutex to serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

const VARS: &[&str] = &[
    "AWS_ACCESS_KEY_ID",
    "AWS_SECRET_ACCESS_KEY",
    "AWS_SESSION_TOKEN",
    "AWS_PROFILE",
    "AWS_SHARED_CREDENTIALS_FILE",
    "AWS_CONFIG_FILE",
    "AWS_WEB_IDENTITY_TOKEN_FILE",
    "AWS_ROLE_ARN",
    "AWS_CONTAINER_CREDENTIALS_RELATIVE_URI",
    "AWS_CONTAINER_CREDENTIALS_FULL_URI",
    "AWS_EC2_METADATA_DISABLED",
];

/// Disables every credential source and restores the environment on drop.
struct IsolatedAwsEnv {
    saved: Vec<(&'static str, Option<String>)>,
    _dir: tempfile::TempDir,
}

impl IsolatedAwsEnv {
    fn new() -> Self {
        let saved = VARS.iter().map(|name| (*name, env::var(name).ok())).collect();
        for name in VARS {
            env::remove_var(name);
        }

        let dir = tempfile::tempdir().unwrap();
        env::set_var("AWS_SHARED_CREDENTIALS_FILE", dir.path().join("missing-credentials"));
        env::set_var("AWS_CONFIG_FILE", dir.path().join("missing-config"));
        env::set_var("AWS_EC2_METADATA_DISABLED", "true");

        Self { saved, _dir: dir }
    }
}

impl Drop for IsolatedAwsEnv {
    fn drop(&mut self) {
        for (name, value) in &self.saved {
            match value {
                Some(value) => env::set_var(name, value),
                None => env::remove_var(name),
            }
        }
    }
}

#[tokio::test]
async fn test_shared_credentials_file_is_used() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let _env = IsolatedAwsEnv::new();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[default]").unwrap();
    writeln!(file, "aws_access_key_id = AKIDPROFILE").unwrap();
    writeln!(file, "aws_secret_access_key = profile-secret-key").unwrap();
    env::set_var("AWS_SHARED_CREDENTIALS_FILE", file.path());

    let creds = DefaultChainCredentials::new().provide_credentials().await.unwrap();

    assert_eq!(creds.access_key_id(), "AKIDPROFILE");
    assert_eq!(creds.secret_access_key().expose_secret(), "profile-secret-key");
    assert!(creds.session_token().is_none());
}

#[tokio::test]
async fn test_environment_keys_are_used() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let _env = IsolatedAwsEnv::new();

    env::set_var("AWS_ACCESS_KEY_ID", "ASIAENVIRONMENT");
    env::set_var("AWS_SECRET_ACCESS_KEY", "environment-secret-key");
    env::set_var("AWS_SESSION_TOKEN", "FwoGZXIvYXdzEXAMPLE");

    let creds = DefaultChainCredentials::new().provide_credentials().await.unwrap();

    assert_eq!(creds.access_key_id(), "ASIAENVIRONMENT");
    assert_eq!(creds.session_token().map(|t| t.expose_secret()), Some("FwoGZXIvYXdzEXAMPLE"));
}

#[tokio::test]
async fn test_no_source_is_signing_error() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let _env = IsolatedAwsEnv::new();

    let err = DefaultChainCredentials::new().provide_credentials().await.unwrap_err();
    assert!(matches!(err, BridgeError::Signing(_)), "{err:?}");
}
