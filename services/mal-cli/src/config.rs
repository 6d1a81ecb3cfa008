//! Configuration types and loading
//!
//! Precedence: env vars > config file > defaults. A missing config file is
//! not an error; every field has a default. The password for the password
//! grant comes from the MAL_PASSWORD env var or `login.password_file`, never
//! from the TOML itself.

use common::Secret;
use mal_auth::{API_BASE_URL, DEFAULT_CLIENT_ID, Endpoints, OAUTH_BASE_URL};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// JSON file holding saved sessions
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,
    /// Name the session is saved under in the credential file
    #[serde(default = "default_account")]
    pub account: String,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub login: LoginConfig,
}

/// Base URL overrides, mostly for testing against a local server
#[derive(Debug, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_oauth_base")]
    pub oauth_base: String,
}

/// Password-grant credentials
#[derive(Debug, Default, Deserialize)]
pub struct LoginConfig {
    pub username: Option<String>,
    #[serde(default)]
    pub password_file: Option<PathBuf>,
    #[serde(skip)]
    pub password: Option<Secret<String>>,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            oauth_base: default_oauth_base(),
        }
    }
}

impl EndpointsConfig {
    pub fn to_endpoints(&self) -> Endpoints {
        Endpoints::new(self.api_base.as_str(), self.oauth_base.as_str())
    }
}

fn default_client_id() -> String {
    DEFAULT_CLIENT_ID.to_owned()
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("mal-credentials.json")
}

fn default_account() -> String {
    "default".to_owned()
}

fn default_api_base() -> String {
    API_BASE_URL.to_owned()
}

fn default_oauth_base() -> String {
    OAUTH_BASE_URL.to_owned()
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// A missing file yields the defaults.
    ///
    /// Client ID resolution: MAL_CLIENT_ID env var, then `client_id`.
    /// Password resolution: MAL_PASSWORD env var, then `login.password_file`.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = if path.exists() {
            std::fs::read_to_string(path)?
        } else {
            String::new()
        };
        let mut config: Config = toml::from_str(&contents)?;

        if let Ok(client_id) = std::env::var("MAL_CLIENT_ID") {
            config.client_id = client_id;
        }

        if config.client_id.trim().is_empty() {
            return Err(common::Error::EmptyField("client_id"));
        }

        if config.account.trim().is_empty() {
            return Err(common::Error::EmptyField("account"));
        }

        for (field, url) in [
            ("api_base", &config.endpoints.api_base),
            ("oauth_base", &config.endpoints.oauth_base),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(common::Error::InvalidBaseUrl {
                    field,
                    url: url.clone(),
                });
            }
        }

        if let Ok(password) = std::env::var("MAL_PASSWORD") {
            config.login.password = Some(Secret::new(password));
        } else if let Some(ref password_file) = config.login.password_file {
            let password = std::fs::read_to_string(password_file).map_err(|source| {
                common::Error::PasswordFile {
                    path: password_file.clone(),
                    source,
                }
            })?;
            let password = password.trim_end_matches(['\r', '\n']).to_owned();
            if !password.is_empty() {
                config.login.password = Some(Secret::new(password));
            }
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&Path>) -> PathBuf {
        if let Some(p) = cli_path {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("mal.toml")
    }
}
