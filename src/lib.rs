//! Pandora Command-Line Client Library
//!
//! This library talks to Pandora's private web API on behalf of a signed-in
//! listener. It bootstraps an authenticated REST transport, negotiates playback
//! sessions (station or on-demand source plus the current track), fetches and
//! de-obfuscates the audio payload, and exposes session-derived state to the
//! command-line front end.
//!
//! # Modules
//!
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration management and environment variables
//! - `error` - The `PandoraError` taxonomy
//! - `logging` - Tracing subscriber setup
//! - `management` - Persisted listener credentials
//! - `pandora` - Pandora web API client: transport, classification, sessions, audio
//! - `player` - External player process used as the playback sink
//! - `types` - Data structures and type definitions
//! - `utils` - Utility functions and helpers
//!
//! # Example
//!
//! ```no_run
//! use pandorcli::{config, management::AuthManager, pandora::transport::RestTransport};
//!
//! #[tokio::main]
//! async fn main() -> pandorcli::Res<()> {
//!     config::load_env().await?;
//!     let auth = AuthManager::load().await?;
//!     let transport = RestTransport::new(config::base_url(), auth.context()?)?;
//!     transport.bootstrap().await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod management;
pub mod pandora;
pub mod player;
pub mod types;
pub mod utils;

pub use error::PandoraError;

/// A convenient Result type alias for operations that may fail.
///
/// Every library operation reports failures through [`PandoraError`], whose
/// variants tell the caller whether to retry, stop gracefully or abort.
///
/// # Type Parameters
///
/// - `T` - The success type returned on successful operations
pub type Res<T> = std::result::Result<T, PandoraError>;

/// Prints an informational message with a blue bullet point.
///
/// Creates a formatted output line with a distinctive blue "o" indicator
/// followed by the provided message. Used for general information and
/// status updates throughout the application.
///
/// # Arguments
///
/// The macro accepts the same arguments as `println!`, supporting format
/// strings and interpolation.
///
/// # Example
///
/// ```ignore
/// info!("Connecting to Pandora...");
/// info!("Found {} stations", count);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// Creates a formatted output line with a green "✓" indicator to signify
/// successful completion of operations. Used to provide positive feedback
/// when operations complete successfully.
///
/// # Arguments
///
/// The macro accepts the same arguments as `println!`, supporting format
/// strings and interpolation.
///
/// # Example
///
/// ```ignore
/// success!("Credentials saved");
/// success!("Thumbed up {}", song_name);
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Creates a formatted error output with a red "!" indicator and immediately
/// terminates the program with exit code 1. Used for unrecoverable errors
/// that require immediate program termination.
///
/// # Arguments
///
/// The macro accepts the same arguments as `println!`, supporting format
/// strings and interpolation.
///
/// # Behavior
///
/// This macro will cause the program to exit immediately after printing
/// the error message. It should only be used for fatal errors where
/// recovery is not possible.
///
/// # Example
///
/// ```ignore
/// error!("Failed to bootstrap the transport");
/// error!("Missing required environment variable: {}", var_name);
/// // Program exits here - code after this will not execute
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// Creates a formatted output line with a yellow "!" indicator to highlight
/// potential issues or important notices that don't require program termination.
/// Used for recoverable issues or important information that users should notice.
///
/// # Arguments
///
/// The macro accepts the same arguments as `println!`, supporting format
/// strings and interpolation.
///
/// # Example
///
/// ```ignore
/// warning!("No active station, rating ignored");
/// warning!("Attempt {} failed", attempt);
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
