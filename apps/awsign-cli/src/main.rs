//! awsign - mint signed AWS artifacts from the environment.
//!
//! Resolves credentials the same way the libraries do (static environment
//! variables, then the container credentials endpoint) and prints the
//! requested artifact to stdout. Logs go to stderr.
//!
//! # Usage
//!
//! ```text
//! AWS_REGION=us-east-1 awsign db-token --host my-proxy.proxy-abc.us-east-1.rds.amazonaws.com --username app_user
//! S3_BUCKET=uploads awsign presign-get avatars/42.png
//! WEBHOOK_SECRET=s3cr3t awsign verify-webhook --header 't=1700000000,v1=...' body.json
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `AWS_REGION` / `AWS_DEFAULT_REGION` | *(unset)* | Signing region (overridden by `--region`) |
//! | `S3_BUCKET` and other `S3_*` | see `StorageConfig` | Object-storage settings |
//! | `WEBHOOK_SECRET` | *(unset)* | Secret for `verify-webhook` |
//! | `LOG_LEVEL` | `warn` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use awsign_auth::{ConnectTokenGenerator, CredentialProvider, EnvCredentialProvider};
use awsign_core::{HttpTransport, ReqwestTransport};
use awsign_s3::{ObjectStoreClient, StorageConfig};
use awsign_webhook::WebhookVerifier;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// CLI version.
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "awsign", version, about = "Mint SigV4-signed tokens and URLs", long_about = None)]
struct Cli {
    /// Log level filter, used when `RUST_LOG` is unset.
    #[arg(long, env = "LOG_LEVEL", default_value = "warn", global = true)]
    log_level: String,

    /// Signing region. Defaults to `AWS_REGION`, then `AWS_DEFAULT_REGION`.
    #[arg(long, global = true)]
    region: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print an RDS IAM auth token.
    DbToken {
        /// Database or proxy endpoint.
        #[arg(long)]
        host: String,
        /// Database port.
        #[arg(long, default_value_t = 5432)]
        port: u16,
        /// Database user.
        #[arg(long)]
        username: String,
    },
    /// Print an ElastiCache IAM auth token.
    CacheToken {
        /// Replication group or serverless cache name.
        #[arg(long)]
        cluster_id: String,
        /// Cache user.
        #[arg(long)]
        username: String,
    },
    /// Print a presigned download URL.
    PresignGet {
        /// Object key.
        key: String,
    },
    /// Print a presigned upload as JSON.
    PresignPost {
        /// Object key.
        key: String,
        /// Content type the upload must declare.
        #[arg(long, default_value = "application/octet-stream")]
        content_type: String,
    },
    /// Print an object's metadata as JSON.
    HeadObject {
        /// Object key.
        key: String,
    },
    /// Delete an object.
    DeleteObject {
        /// Object key.
        key: String,
    },
    /// Print one page of a listing as JSON.
    ListObjects {
        /// Key prefix.
        #[arg(long, default_value = "")]
        prefix: String,
        /// Page size.
        #[arg(long, default_value_t = 1000)]
        max_keys: u32,
        /// Continuation token from a previous page.
        #[arg(long)]
        continuation_token: Option<String>,
    },
    /// Verify a webhook body and print the decoded event.
    VerifyWebhook {
        /// Signature header value.
        #[arg(long)]
        header: String,
        /// Shared secret.
        #[arg(long, env = "WEBHOOK_SECRET", hide_env_values = true)]
        secret: String,
        /// Reject composite headers whose timestamp is further than this from now.
        #[arg(long)]
        tolerance_secs: Option<u64>,
        /// File holding the raw request body.
        payload: PathBuf,
    },
}

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to `log_level`.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    Ok(())
}

/// Apply the `--region` override to the environment configuration.
fn build_config(region: Option<String>) -> StorageConfig {
    let mut config = StorageConfig::from_env();
    if let Some(region) = region {
        config.region = region;
    }
    config
}

async fn run<T, P>(
    command: Command,
    config: StorageConfig,
    transport: T,
    credentials: P,
) -> Result<()>
where
    T: HttpTransport,
    P: CredentialProvider,
{
    match command {
        Command::DbToken {
            host,
            port,
            username,
        } => {
            let region = config
                .require_region()
                .context("signing region is not set")?;
            let token = ConnectTokenGenerator::new(credentials)
                .database_connect_token(&host, port, &username, region)
                .await
                .context("failed to generate database token")?;
            println!("{token}");
        }
        Command::CacheToken {
            cluster_id,
            username,
        } => {
            let region = config
                .require_region()
                .context("signing region is not set")?;
            let token = ConnectTokenGenerator::new(credentials)
                .cache_connect_token(&cluster_id, &username, region)
                .await
                .context("failed to generate cache token")?;
            println!("{token}");
        }
        Command::PresignGet { key } => {
            let client = ObjectStoreClient::new(config, transport, credentials);
            let url = client
                .presigned_get(&key)
                .await
                .with_context(|| format!("failed to presign download of {key}"))?;
            println!("{url}");
        }
        Command::PresignPost { key, content_type } => {
            let client = ObjectStoreClient::new(config, transport, credentials);
            let post = client
                .presigned_post(&key, &content_type)
                .await
                .with_context(|| format!("failed to presign upload of {key}"))?;
            println!("{}", serde_json::to_string_pretty(&post)?);
        }
        Command::HeadObject { key } => {
            let client = ObjectStoreClient::new(config, transport, credentials);
            let metadata = client
                .head_object(&key)
                .await
                .with_context(|| format!("failed to read metadata of {key}"))?;
            println!("{}", serde_json::to_string_pretty(&metadata)?);
        }
        Command::DeleteObject { key } => {
            let client = ObjectStoreClient::new(config, transport, credentials);
            client
                .delete_object(&key)
                .await
                .with_context(|| format!("failed to delete {key}"))?;
        }
        Command::ListObjects {
            prefix,
            max_keys,
            continuation_token,
        } => {
            let client = ObjectStoreClient::new(config, transport, credentials);
            let listing = client
                .list_objects(&prefix, max_keys, continuation_token.as_deref())
                .await
                .with_context(|| format!("failed to list objects under '{prefix}'"))?;
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        Command::VerifyWebhook {
            header,
            secret,
            tolerance_secs,
            payload,
        } => {
            let body = std::fs::read(&payload)
                .with_context(|| format!("failed to read {}", payload.display()))?;
            let mut verifier = WebhookVerifier::new(secret);
            if let Some(secs) = tolerance_secs {
                verifier = verifier.with_tolerance(Duration::from_secs(secs));
            }
            let event = verifier
                .verify(&body, &header)
                .context("webhook rejected")?;
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_level)?;
    debug!(version = VERSION, "starting awsign");

    let config = build_config(cli.region);
    let transport = Arc::new(
        ReqwestTransport::with_timeout(ReqwestTransport::DEFAULT_TIMEOUT)
            .context("failed to build HTTP client")?,
    );
    let credentials = EnvCredentialProvider::new(Arc::clone(&transport));

    run(cli.command, config, transport, credentials).await
}
