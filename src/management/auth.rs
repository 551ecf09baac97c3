use std::path::PathBuf;

use tracing::debug;

use crate::{
    PandoraError, Res, config, pandora::session::AuthProvider, types::AuthContext,
};

/// Persisted listener credentials.
///
/// Stored as JSON in `<data dir>/cache/auth.json`. Each field can be replaced
/// through the environment (`PANDORA_AUTH_TOKEN`, `PANDORA_LISTENER_ID`,
/// `PANDORA_CLIENT_VERSION`), which also allows running without a file.
pub struct AuthManager {
    stored: Option<AuthContext>,
}

impl AuthManager {
    pub fn new(context: AuthContext) -> Self {
        AuthManager {
            stored: Some(context),
        }
    }

    /// Loads the credential file; a missing file is not an error.
    pub async fn load() -> Res<Self> {
        let path = Self::auth_path();
        if !path.is_file() {
            debug!(path = %path.display(), "no stored credentials");
            return Ok(Self { stored: None });
        }

        let content = async_fs::read_to_string(&path).await?;
        let context: AuthContext = serde_json::from_str(&content)?;
        Ok(Self {
            stored: Some(context),
        })
    }

    pub async fn persist(&self) -> Res<()> {
        let Some(context) = &self.stored else {
            return Err(PandoraError::Auth("no credentials to store".to_string()));
        };

        let path = Self::auth_path();
        if let Some(parent) = path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(context)?;
        async_fs::write(&path, json).await?;
        Ok(())
    }

    /// The effective credentials: environment overrides on top of the file.
    ///
    /// # Errors
    ///
    /// [`PandoraError::Auth`] when the token or listener id is unavailable.
    pub fn context(&self) -> Res<AuthContext> {
        merge(
            self.stored.as_ref(),
            config::auth_token(),
            config::listener_id(),
            config::web_client_version(),
        )
    }

    pub fn auth_path() -> PathBuf {
        config::data_dir().join("cache").join("auth.json")
    }
}

impl AuthProvider for AuthManager {
    fn auth_context(&self) -> Res<AuthContext> {
        self.context()
    }
}

fn merge(
    stored: Option<&AuthContext>,
    token: Option<String>,
    listener_id: Option<String>,
    version: Option<String>,
) -> Res<AuthContext> {
    let token = token
        .or_else(|| stored.map(|s| s.auth_token.clone()))
        .filter(|t| !t.is_empty())
        .ok_or_else(|| PandoraError::Auth("no auth token, run `pandorcli auth`".to_string()))?;
    let listener_id = listener_id
        .or_else(|| stored.map(|s| s.listener_id.clone()))
        .filter(|l| !l.is_empty())
        .ok_or_else(|| PandoraError::Auth("no listener id, run `pandorcli auth`".to_string()))?;
    let web_client_version = version
        .or_else(|| stored.map(|s| s.web_client_version.clone()))
        .unwrap_or_default();

    Ok(AuthContext {
        auth_token: token,
        listener_id,
        web_client_version,
    })
}
