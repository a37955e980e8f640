//! Configuration management for the Spotify CLI.
//!
//! Settings come from environment variables, optionally seeded from a `.env`
//! file in the local data directory. The configuration system follows a
//! hierarchical approach:
//! 1. Variables already present in the process environment (highest priority)
//! 2. The `.env` file (`SPT_ENV_PATH`, or `sptcli/.env` in the local data directory)
//! 3. Application defaults for everything that is not a client credential

use std::{env, path::PathBuf, time::Duration};

use crate::{error::ConfigError, management::FileCredentialStore};

pub const DEFAULT_HOST_IP: &str = "127.0.0.1";
pub const DEFAULT_HOST_PORT: u16 = 6949;
pub const SPOTIFY_AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize/";
pub const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token/";
pub const SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";

const REQUIRED_SETTINGS: [&str; 3] = ["SPT_CLIENT_ID", "SPT_CLIENT_SECRET", "SPT_REDIRECT_URI"];

/// Loads environment variables from the `.env` file, if there is one.
///
/// Creates the local data directory on the way so that users find the place
/// where the file is expected. A missing file is not an error: the required
/// variables may already be exported in the shell.
///
/// # Directory Structure
///
/// Without `SPT_ENV_PATH` the file is looked up in:
/// - Linux: `~/.local/share/sptcli/.env`
/// - macOS: `~/Library/Application Support/sptcli/.env`
/// - Windows: `%LOCALAPPDATA%/sptcli/.env`
///
/// # Errors
///
/// Returns [`ConfigError::Env`] if the directory cannot be created or the file
/// exists but cannot be parsed.
pub async fn load_env() -> Result<(), ConfigError> {
    let path = env_path();
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| ConfigError::Env(e.to_string()))?;
    }

    if path.is_file() {
        dotenv::from_path(&path).map_err(|e| ConfigError::Env(e.to_string()))?;
    }
    Ok(())
}

fn env_path() -> PathBuf {
    if let Ok(path) = env::var("SPT_ENV_PATH") {
        return PathBuf::from(path);
    }
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("sptcli/.env");
    path
}

/// Everything the authorization core needs from the outside world.
#[derive(Debug, Clone)]
pub struct Settings {
    pub client_id: String,
    pub client_secret: String,
    /// Must match the redirect URI registered with the Spotify application.
    pub redirect_uri: String,
    pub host: String,
    pub port: u16,
    pub credentials_path: PathBuf,
    pub authorize_url: String,
    pub token_url: String,
    pub api_url: String,
    /// `None` waits for the browser flow indefinitely.
    pub login_timeout: Option<Duration>,
}

impl Settings {
    /// Reads the settings from the process environment.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Missing`] listing every required variable that is unset
    /// - [`ConfigError::Invalid`] when a numeric variable cannot be parsed
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the settings through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let missing: Vec<String> = REQUIRED_SETTINGS
            .iter()
            .filter(|name| get(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let port = match get("SPT_HOST_PORT") {
            Some(value) => value.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                name: "SPT_HOST_PORT".to_string(),
                value,
            })?,
            None => DEFAULT_HOST_PORT,
        };

        let login_timeout = match get("SPT_LOGIN_TIMEOUT") {
            Some(value) => {
                let secs = value.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
                    name: "SPT_LOGIN_TIMEOUT".to_string(),
                    value,
                })?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            client_id: get("SPT_CLIENT_ID").unwrap_or_default(),
            client_secret: get("SPT_CLIENT_SECRET").unwrap_or_default(),
            redirect_uri: get("SPT_REDIRECT_URI").unwrap_or_default(),
            host: get("SPT_HOST_IP").unwrap_or_else(|| DEFAULT_HOST_IP.to_string()),
            port,
            credentials_path: get("SPT_SECURITY_STORE")
                .map(PathBuf::from)
                .unwrap_or_else(FileCredentialStore::default_path),
            authorize_url: get("SPT_AUTHORIZE_URL")
                .unwrap_or_else(|| SPOTIFY_AUTHORIZE_URL.to_string()),
            token_url: get("SPT_TOKEN_URL").unwrap_or_else(|| SPOTIFY_TOKEN_URL.to_string()),
            api_url: get("SPT_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| SPOTIFY_API_URL.to_string()),
            login_timeout,
        })
    }

    /// Address the callback listener binds to, e.g. `127.0.0.1:6949`.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
