//! Session CLI
//!
//! Command-line front end for the session client:
//! 1. Loads the TOML config and a file-backed credential store
//! 2. `login` stores an issued token pair
//! 3. `request` calls the API, refreshing the session transparently on expiry
//! 4. `status` and `logout` inspect or end the session

mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use session_auth::FileCredentialStore;
use session_client::{ApiCall, SessionClient};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true, env = "CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Store an issued credential
    Login {
        access_token: String,
        refresh_token: String,
    },
    /// Show whether a session is stored
    Status,
    /// Call the API with the stored session
    Request {
        #[arg(value_enum, ignore_case = true)]
        method: Method,
        path: String,
        /// JSON request body
        #[arg(value_parser = parse_json)]
        body: Option<serde_json::Value>,
    },
    /// End the session
    Logout,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Get,
    Post,
    Put,
    Delete,
}

fn parse_json(raw: &str) -> std::result::Result<serde_json::Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("not valid JSON: {e}"))
}

fn build_call(method: Method, path: &str, body: Option<serde_json::Value>) -> ApiCall {
    let call = match method {
        Method::Get => ApiCall::get(path),
        Method::Post => ApiCall::post(path),
        Method::Put => ApiCall::put(path),
        Method::Delete => ApiCall::delete(path),
    };
    match body {
        Some(body) => call.with_json(body),
        None => call,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let config_path = Config::resolve_path(cli.config);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        base_url = %config.api.base_url,
        timeout_secs = config.api.timeout_secs,
        refresh_timeout_secs = config.api.refresh_timeout_secs,
        credentials_path = %config.session.credentials_path.display(),
        "configuration loaded"
    );

    let store = FileCredentialStore::load(config.session.credentials_path.clone())
        .with_context(|| {
            format!(
                "failed to load credentials from {}",
                config.session.credentials_path.display()
            )
        })?;

    let client = SessionClient::builder()
        .base_url(config.api.base_url.clone())
        .timeout(Duration::from_secs(config.api.timeout_secs))
        .refresh_timeout(Duration::from_secs(config.api.refresh_timeout_secs))
        .store(Arc::new(store))
        .notifier(Arc::new(|reason: &str| {
            warn!(reason, "session expired, run `session-cli login` to sign in again");
        }))
        .build()
        .context("failed to build session client")?;

    match cli.command {
        Command::Login {
            access_token,
            refresh_token,
        } => {
            client.login(access_token, refresh_token)?;
            println!("logged in");
        }
        Command::Status => {
            if client.is_authenticated() {
                println!("authenticated");
            } else {
                println!("not authenticated");
            }
        }
        Command::Request { method, path, body } => {
            let response = client.send(build_call(method, &path, body)).await?;
            println!("{}", response.body);
        }
        Command::Logout => {
            client.logout().await?;
            println!("logged out");
        }
    }

    Ok(())
}
