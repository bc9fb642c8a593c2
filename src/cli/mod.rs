//! # Command Line Interface
//!
//! Thin binary surface: collects configuration from flags, environment and
//! `.env`, runs one handshake and prints the secret.

pub mod output;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use crate::aws::credentials::DefaultChainCredentials;
use crate::config::{
    BridgeConfig, SecretPath, StsConfig, DEFAULT_SECRET_MOUNT, DEFAULT_STS_ENDPOINT,
    DEFAULT_STS_REGION,
};
use crate::flow::HandshakeFlow;
use crate::observability::{init_logging, LoggingConfig};
use output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "vaultbridge")]
#[command(about = "Log in to Vault with an AWS identity and read a secret")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Vault address
    #[arg(long, env = "VAULT_ADDR", default_value = "http://127.0.0.1:8200")]
    pub address: String,

    /// Mount path of the AWS auth method
    #[arg(long, env = "VAULT_AUTH_PROVIDER", default_value = "aws")]
    pub auth_provider: String,

    /// Vault role to log in as
    #[arg(long, env = "VAULT_AUTH_ROLE")]
    pub role: String,

    /// Value of the X-Vault-AWS-IAM-Server-ID header
    #[arg(long, env = "VAULT_AUTH_HEADER")]
    pub auth_header: Option<String>,

    /// Vault Enterprise namespace
    #[arg(long, env = "VAULT_NAMESPACE")]
    pub namespace: Option<String>,

    /// KV v2 mount of the secret
    #[arg(long, env = "VAULT_SECRET_MOUNT", default_value = DEFAULT_SECRET_MOUNT)]
    pub mount: String,

    /// Secret path below the mount
    #[arg(long, env = "VAULT_SECRET_PATH", default_value = "data/foo")]
    pub path: String,

    /// Region used in the STS signing scope
    #[arg(long, env = "AWS_STS_REGION", default_value = DEFAULT_STS_REGION)]
    pub sts_region: String,

    /// STS endpoint the proof is addressed to
    #[arg(long, env = "AWS_STS_ENDPOINT", default_value = DEFAULT_STS_ENDPOINT)]
    pub sts_endpoint: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Output format of the secret
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    pub output: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Log as JSON lines
    #[arg(long)]
    pub json_logs: bool,
}

impl Cli {
    pub fn bridge_config(&self) -> BridgeConfig {
        let mut config = BridgeConfig::new(&self.address, &self.auth_provider, &self.role)
            .with_sts(StsConfig { region: self.sts_region.clone(), endpoint: self.sts_endpoint.clone() })
            .with_request_timeout(Duration::from_secs(self.timeout));
        if let Some(header) = &self.auth_header {
            config = config.with_auth_header(header);
        }
        if let Some(namespace) = &self.namespace {
            config = config.with_namespace(namespace);
        }
        config
    }

    pub fn secret_path(&self) -> SecretPath {
        SecretPath::new(&self.path).with_mount(&self.mount)
    }
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&LoggingConfig::new(cli.verbose, cli.json_logs));

    let config = cli.bridge_config();
    info!(
        address = %config.store_address,
        provider = %config.auth_provider,
        role = %config.auth_role,
        "Loaded configuration"
    );

    let mut flow = HandshakeFlow::new(config, Arc::new(DefaultChainCredentials::new()))?;
    let payload = flow.run(&cli.secret_path()).await?;

    output::print_payload(&payload, cli.output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_build_config() {
        let cli = Cli::try_parse_from([
            "vaultbridge",
            "--address",
            "https://vault.internal:8200/",
            "--role",
            "example-role-name",
            "--auth-header",
            "vault.example.com",
            "--mount",
            "kv",
            "--path",
            "app/db",
            "--timeout",
            "5",
        ])
        .unwrap();

        let config = cli.bridge_config();
        assert_eq!(config.base_url(), "https://vault.internal:8200");
        assert_eq!(config.auth_provider, "aws");
        assert_eq!(config.server_id(), Some("vault.example.com"));
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(cli.secret_path().full_path(), "kv/data/app/db");
        assert_eq!(cli.output, OutputFormat::Json);
    }

    #[test]
    fn test_zero_timeout_flag_fails_validation() {
        let cli = Cli::try_parse_from(["vaultbridge", "--role", "r", "--timeout", "0"]).unwrap();
        let err = cli.bridge_config().validate().unwrap_err();
        assert!(matches!(err, crate::BridgeError::Configuration(_)), "got {err:?}");
    }

    #[test]
    fn test_output_format_flag() {
        let cli = Cli::try_parse_from(["vaultbridge", "--role", "r", "-o", "keys"]).unwrap();
        assert_eq!(cli.output, OutputFormat::Keys);
    }
}
