//! # CLI Module
//!
//! Command implementations for `pandorcli`. Every command returns
//! [`crate::Res`]; `main` owns the single exit point and maps errors to exit
//! codes.
//!
//! ## Commands
//!
//! - [`auth`] - Opens the Pandora sign-in page and stores the listener credentials
//! - [`stations`] - Lists the listener's stations
//! - [`info`] - Shows the subscription tier
//! - [`collection`] - Lists stations and playlists together
//! - [`play`] - Plays a station with interactive controls
//!
//! ## Flow
//!
//! ```text
//! CLI command
//!     ↓
//! AuthManager (stored credentials)
//!     ↓
//! RestTransport::bootstrap (retried)
//!     ↓
//! Catalog / SessionController
//! ```

mod auth;
mod collection;
mod info;
mod play;
mod stations;

use std::{sync::Arc, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    Res, config,
    management::AuthManager,
    pandora::{retry::RetryPolicy, transport::RestTransport},
};

pub use auth::{AuthArgs, auth};
pub use collection::collection;
pub use info::info;
pub use play::play;
pub use stations::stations;

/// Stored credentials plus a bootstrapped transport.
pub(crate) struct Connection {
    pub auth: AuthManager,
    pub transport: Arc<RestTransport>,
}

/// Loads the credentials and obtains the CSRF token, retrying transient failures.
pub(crate) async fn connect() -> Res<Connection> {
    let auth = AuthManager::load().await?;
    let transport = RestTransport::new(config::base_url(), auth.context()?)?;

    let pb = spinner("Connecting to Pandora...");
    let result = RetryPolicy::from_config()
        .retry(|| transport.bootstrap())
        .await;
    pb.finish_and_clear();
    result?;

    Ok(Connection {
        auth,
        transport: Arc::new(transport),
    })
}

pub(crate) fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb
}
