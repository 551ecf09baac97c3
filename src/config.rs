//! Configuration management for the Pandora client.
//!
//! This module handles loading and accessing configuration values from environment
//! variables and `.env` files. It provides a centralized way to manage application
//! configuration including the service origin, credential overrides, the external
//! player and the retry cadence.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults

use std::{env, path::PathBuf, str::FromStr, time::Duration};

use crate::{PandoraError, Res};

pub const DEFAULT_BASE_URL: &str = "https://www.pandora.com";
pub const DEFAULT_PLAYER: &str = "mpv";
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 10;
pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 3;

/// Returns the application's directory inside the platform data directory.
///
/// - Linux: `~/.local/share/pandorcli`
/// - macOS: `~/Library/Application Support/pandorcli`
/// - Windows: `%LOCALAPPDATA%/pandorcli`
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("pandorcli");
    path
}

/// Loads environment variables from a `.env` file in the local data directory.
///
/// Creates the data directory if it doesn't exist. A missing `.env` file is not
/// an error: every setting has either a default or can be supplied through the
/// process environment.
///
/// # Errors
///
/// Returns [`PandoraError::Io`] if the directory cannot be created and
/// [`PandoraError::Config`] if an existing `.env` file cannot be parsed.
///
/// # Example
///
/// ```ignore
/// use pandorcli::config;
///
/// #[tokio::main]
/// async fn main() {
///     if let Err(e) = config::load_env().await {
///         eprintln!("Configuration error: {}", e);
///     }
/// }
/// ```
pub async fn load_env() -> Res<()> {
    let dir = data_dir();
    async_fs::create_dir_all(&dir).await?;

    let path = dir.join(".env");
    if !path.is_file() {
        return Ok(());
    }

    dotenv::from_path(&path)
        .map(|_| ())
        .map_err(|e| PandoraError::Config(format!("{}: {}", path.display(), e)))
}

/// Returns the web origin every REST path is resolved against.
///
/// Reads `PANDORA_BASE_URL`, defaulting to [`DEFAULT_BASE_URL`]. Tests point
/// this at a local mock server.
pub fn base_url() -> String {
    env::var("PANDORA_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
}

/// Optional override for the persisted auth token (`PANDORA_AUTH_TOKEN`).
pub fn auth_token() -> Option<String> {
    non_empty("PANDORA_AUTH_TOKEN")
}

/// Optional override for the persisted listener id (`PANDORA_LISTENER_ID`).
pub fn listener_id() -> Option<String> {
    non_empty("PANDORA_LISTENER_ID")
}

/// Optional override for the web client version (`PANDORA_CLIENT_VERSION`).
pub fn web_client_version() -> Option<String> {
    non_empty("PANDORA_CLIENT_VERSION")
}

/// Returns the command used to play decoded audio files.
///
/// Reads `PANDORCLI_PLAYER`, defaulting to `mpv`. The value may contain
/// arguments separated by whitespace, e.g. `mpv --no-video`.
pub fn player_command() -> String {
    non_empty("PANDORCLI_PLAYER").unwrap_or_else(|| DEFAULT_PLAYER.to_string())
}

/// Number of attempts the retry policy makes before giving up (`PANDORCLI_RETRY_ATTEMPTS`).
pub fn retry_attempts() -> u32 {
    parsed("PANDORCLI_RETRY_ATTEMPTS").unwrap_or(DEFAULT_RETRY_ATTEMPTS)
}

/// Delay between two attempts of the retry policy (`PANDORCLI_RETRY_INTERVAL_SECS`).
pub fn retry_interval() -> Duration {
    Duration::from_secs(
        parsed("PANDORCLI_RETRY_INTERVAL_SECS").unwrap_or(DEFAULT_RETRY_INTERVAL_SECS),
    )
}

/// Whether the optional playback events are sent (`PANDORCLI_TELEMETRY`).
///
/// Enabled unless the variable is set to `0`, `false` or `off`.
pub fn telemetry_enabled() -> bool {
    match non_empty("PANDORCLI_TELEMETRY") {
        Some(v) => !matches!(v.to_lowercase().as_str(), "0" | "false" | "off"),
        None => true,
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed<T: FromStr>(key: &str) -> Option<T> {
    non_empty(key).and_then(|v| v.parse().ok())
}
