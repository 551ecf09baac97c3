use std::{sync::Arc, time::Duration};

use reqwest::{
    Client, Url,
    cookie::Jar,
    header::{ACCEPT, CONNECTION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT},
};
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::{PandoraError, Res, pandora::classify::RestResponse, types::AuthContext, utils};

const CSRF_COOKIE: &str = "csrftoken";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const X_CSRF_TOKEN: HeaderName = HeaderName::from_static("x-csrftoken");
const X_AUTH_TOKEN: HeaderName = HeaderName::from_static("x-authtoken");

/// Authenticated HTTP wrapper around Pandora's REST endpoints.
///
/// Holds the process-wide cookie jar and the CSRF token. The token is written
/// once by [`RestTransport::bootstrap`] and only read afterwards; every REST
/// call made before bootstrap fails with [`PandoraError::Auth`].
pub struct RestTransport {
    client: Client,
    jar: Arc<Jar>,
    base_url: Url,
    auth: AuthContext,
    user_agent: String,
    csrf: OnceCell<String>,
}

impl RestTransport {
    /// Creates a transport for the given web origin.
    ///
    /// # Errors
    ///
    /// - [`PandoraError::Auth`] if the auth token or listener id is empty
    /// - [`PandoraError::Config`] if `base_url` is not a valid URL
    pub fn new(base_url: impl AsRef<str>, auth: AuthContext) -> Res<Self> {
        if auth.auth_token.trim().is_empty() {
            return Err(PandoraError::Auth("auth token is missing".to_string()));
        }
        if auth.listener_id.trim().is_empty() {
            return Err(PandoraError::Auth("listener id is missing".to_string()));
        }

        let base_url = Url::parse(base_url.as_ref())
            .map_err(|e| PandoraError::Config(format!("invalid base url: {}", e)))?;
        let user_agent = utils::pick_user_agent().to_string();
        let jar = Arc::new(Jar::default());

        let client = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .user_agent(user_agent.clone())
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            jar,
            base_url,
            auth,
            user_agent,
            csrf: OnceCell::new(),
        })
    }

    pub fn auth(&self) -> &AuthContext {
        &self.auth
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn is_initialized(&self) -> bool {
        self.csrf.get().is_some()
    }

    /// Obtains the CSRF token from a `HEAD` request against the web origin.
    ///
    /// The `csrftoken` cookie of the response becomes the value of the
    /// `X-CsrfToken` header and is also kept in the cookie jar. Calling this
    /// again after success does not issue another request.
    ///
    /// # Errors
    ///
    /// [`PandoraError::Auth`] if the response carries no `csrftoken` cookie.
    pub async fn bootstrap(&self) -> Res<()> {
        if self.is_initialized() {
            debug!("transport already bootstrapped");
            return Ok(());
        }

        self.csrf.get_or_try_init(|| self.fetch_csrf()).await?;
        Ok(())
    }

    /// Concurrent callers share this one request.
    async fn fetch_csrf(&self) -> Res<String> {
        let response = self.client.head(self.base_url.clone()).send().await?;
        debug!(status = %response.status(), "bootstrap HEAD");

        let token = response
            .cookies()
            .find(|cookie| cookie.name() == CSRF_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                PandoraError::Auth(format!(
                    "no {} cookie in response from {}",
                    CSRF_COOKIE, self.base_url
                ))
            })?;

        self.jar
            .add_cookie_str(&format!("{}={}", CSRF_COOKIE, token), &self.base_url);
        Ok(token)
    }

    fn csrf(&self) -> Res<&str> {
        self.csrf
            .get()
            .map(String::as_str)
            .ok_or_else(|| PandoraError::Auth("CSRF token not initialized".to_string()))
    }

    fn endpoint(&self, path: &str) -> Res<Url> {
        self.base_url
            .join(path)
            .map_err(|e| PandoraError::Config(format!("invalid path {}: {}", path, e)))
    }

    fn headers(&self, csrf: &str, extra: &[(&str, &str)]) -> Res<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(X_CSRF_TOKEN, header_value(csrf)?);
        headers.insert(X_AUTH_TOKEN, header_value(&self.auth.auth_token)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, header_value(&self.user_agent)?);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

        for (name, value) in extra {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| PandoraError::Config(format!("invalid header {}: {}", name, e)))?;
            headers.insert(name, header_value(value)?);
        }
        Ok(headers)
    }

    /// Sends a JSON `POST` and returns the raw body.
    ///
    /// `extra_headers` override the fixed header set. Used directly for
    /// endpoints whose answer has no classified shape (ratings, events).
    pub async fn request_value(
        &self,
        path: &str,
        body: &Value,
        extra_headers: &[(&str, &str)],
    ) -> Res<Value> {
        let csrf = self.csrf()?;
        let url = self.endpoint(path)?;
        let headers = self.headers(csrf, extra_headers)?;

        debug!(%path, "POST");
        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        debug!(%path, %status, "response");
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(%path, %status, "request rejected");
            return Err(PandoraError::Status {
                code: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<Value>().await?)
    }

    /// Sends a JSON `POST` and classifies the body.
    pub async fn request(
        &self,
        path: &str,
        body: &Value,
        extra_headers: &[(&str, &str)],
    ) -> Res<RestResponse> {
        let value = self.request_value(path, body, extra_headers).await?;
        RestResponse::from_value(value)
    }

    pub async fn post(&self, path: &str, body: &Value) -> Res<RestResponse> {
        self.request(path, body, &[]).await
    }

    /// Plain `GET` of a binary resource (track audio).
    pub async fn fetch_bytes(&self, url: &str) -> Res<Vec<u8>> {
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .header(CONNECTION, "keep-alive")
            .header(USER_AGENT, self.user_agent.as_str())
            .send()
            .await?
            .error_for_status()?;

        Ok(response.bytes().await?.to_vec())
    }
}

fn header_value(value: &str) -> Res<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| PandoraError::Config(format!("invalid header value: {}", e)))
}
