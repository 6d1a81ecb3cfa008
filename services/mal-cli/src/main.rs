//! MyAnimeList command-line client
//!
//! Drives the login flows and a few lookups:
//! 1. `authorize-url` prints a fresh verifier and the URL to approve access
//! 2. `exchange <code> <verifier>` completes the flow and saves the session
//! 3. `refresh`, `me` and `anime <id>` reuse the saved session

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mal_api::SessionExt;
use mal_auth::{Auth, CredentialStore, HttpTransport, Session};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[derive(Debug, Parser)]
#[command(name = "mal")]
#[command(about = "MyAnimeList client: sign in, refresh and look things up")]
#[command(version)]
struct Cli {
    /// Config file (falls back to CONFIG_PATH, then ./mal.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
enum Command {
    /// Print a fresh code verifier and the URL to approve access
    AuthorizeUrl,
    /// Exchange an authorization code and save the session
    Exchange {
        /// Code from the redirect after approval
        code: String,
        /// Verifier printed by authorize-url
        verifier: String,
    },
    /// Sign in with the configured username and password (unstable)
    Login,
    /// Refresh the saved session
    Refresh,
    /// Show the signed-in user
    Me,
    /// Show anime details, as a guest when no session is saved
    Anime {
        /// MyAnimeList anime id
        id: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so command output on stdout stays clean
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    let config_path = Config::resolve_path(cli.config.as_deref());
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        path = %config_path.display(),
        account = %config.account,
        credentials = %config.credentials_path.display(),
        "configuration loaded"
    );

    let transport = Arc::new(HttpTransport::with_endpoints(
        config.endpoints.to_endpoints(),
    ));
    let auth = Auth::new(config.client_id.clone(), transport).context("invalid client_id")?;

    match cli.command {
        Command::AuthorizeUrl => {
            let verifier = Auth::code_verifier();
            println!("verifier: {verifier}");
            println!("{}", auth.oauth_url(&verifier));
        }
        Command::Exchange { code, verifier } => {
            let session = auth.login_with_code(&code, &verifier).await?;
            save(&config, &session).await?;
        }
        Command::Login => {
            let username = config
                .login
                .username
                .as_deref()
                .context("login.username is not configured")?;
            let password = config
                .login
                .password
                .as_ref()
                .context("set MAL_PASSWORD or login.password_file")?;
            let session = auth.unstable_login(username, password.expose()).await?;
            save(&config, &session).await?;
        }
        Command::Refresh => {
            let store = open_store(&config).await?;
            let mut session = auth.login_from_store(&store, &config.account).await?;
            session.refresh().await?;
            session.save(&store, &config.account).await?;
            info!(account = %config.account, "session refreshed");
        }
        Command::Me => {
            let store = open_store(&config).await?;
            let session = auth.login_from_store(&store, &config.account).await?;
            print_json(&session.user().me(None).await?)?;
        }
        Command::Anime { id } => {
            let session = saved_or_guest(&auth, &config).await?;
            print_json(&session.anime().details(id, None).await?)?;
        }
    }

    Ok(())
}

async fn open_store(config: &Config) -> Result<CredentialStore> {
    CredentialStore::load(config.credentials_path.clone())
        .await
        .with_context(|| {
            format!(
                "failed to open credential file {}",
                config.credentials_path.display()
            )
        })
}

/// The saved session if one exists, otherwise a guest. Never creates the
/// credential file.
async fn saved_or_guest(auth: &Auth, config: &Config) -> Result<Session> {
    if !config.credentials_path.exists() {
        return Ok(auth.guest_login()?);
    }
    let store = open_store(config).await?;
    match auth.login_from_store(&store, &config.account).await {
        Ok(session) => Ok(session),
        Err(mal_auth::Error::NotFound(_)) => Ok(auth.guest_login()?),
        Err(e) => Err(e.into()),
    }
}

async fn save(config: &Config, session: &Session) -> Result<()> {
    let store = open_store(config).await?;
    session.save(&store, &config.account).await?;
    info!(account = %config.account, "session saved");
    Ok(())
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
