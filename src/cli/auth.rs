use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin, stdin, stdout};

use crate::{
    PandoraError, Res, config, info, management::AuthManager, success, types::AuthContext,
    warning,
};

const SIGN_IN_PATH: &str = "/account/sign-in";

/// Values passed on the command line; anything missing is prompted for.
#[derive(Debug, Clone, Default)]
pub struct AuthArgs {
    pub token: Option<String>,
    pub listener_id: Option<String>,
    pub client_version: Option<String>,
}

/// Stores the listener credentials.
///
/// The sign-in page is opened in the default browser. The values come from the
/// `/api/v1/auth/login` response the page receives (`authToken`, `listenerId`
/// and `webClientVersion`).
pub async fn auth(args: AuthArgs) -> Res<()> {
    let sign_in = format!("{}{}", config::base_url().trim_end_matches('/'), SIGN_IN_PATH);
    if webbrowser::open(&sign_in).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            sign_in
        );
    } else {
        info!("Sign in at {} and copy the values of the login response.", sign_in);
    }

    let mut lines = BufReader::new(stdin()).lines();
    let auth_token = value_or_prompt(args.token, "authToken", &mut lines).await?;
    let listener_id = value_or_prompt(args.listener_id, "listenerId", &mut lines).await?;
    let web_client_version =
        value_or_prompt(args.client_version, "webClientVersion", &mut lines).await?;

    let manager = AuthManager::new(AuthContext {
        auth_token,
        listener_id,
        web_client_version,
    });
    manager.persist().await?;

    success!("Credentials saved to {}", AuthManager::auth_path().display());
    Ok(())
}

async fn value_or_prompt(
    value: Option<String>,
    name: &str,
    lines: &mut Lines<BufReader<Stdin>>,
) -> Res<String> {
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        return Ok(value.trim().to_string());
    }

    let mut out = stdout();
    out.write_all(format!("{}: ", name).as_bytes()).await?;
    out.flush().await?;

    lines
        .next_line()
        .await?
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .ok_or_else(|| PandoraError::Auth(format!("{} is required", name)))
}
