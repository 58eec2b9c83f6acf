//! Authenticated request gateway.
//!
//! Every call to a backend resource goes through [`Gateway::request`]: the
//! current access token is attached as a bearer credential, and a 401 on the
//! first attempt triggers exactly one refresh-and-retry cycle. This is the
//! only place in the crate that decides a session is no longer valid.

mod refresh;

pub use refresh::{RefreshProtocol, REFRESH_PATH};

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info_span, Instrument};
use url::Url;

use crate::config::BackendConfig;
use crate::error::{detail_or_fallback, ClientError};
use crate::session::SessionManager;

pub struct Gateway {
    http: Client,
    base_url: Url,
    session: Arc<SessionManager>,
    refresher: RefreshProtocol,
}

impl Gateway {
    pub fn new(config: &BackendConfig, session: Arc<SessionManager>) -> Result<Self, ClientError> {
        let http = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ClientError::InvalidRequest(format!("failed to build HTTP client: {}", e)))?;

        let refresh_endpoint = join(&config.base_url, REFRESH_PATH)?;
        let refresher = RefreshProtocol::new(
            http.clone(),
            refresh_endpoint,
            Duration::from_secs(config.refresh_timeout_secs),
            session.clone(),
        );

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            session,
            refresher,
        })
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        join(&self.base_url, path)
    }

    /// Authenticated call with a single refresh-and-retry on 401.
    pub async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value, ClientError> {
        let url = self.endpoint(path)?;
        let token = self.session.access_token();

        let span = info_span!(
            "portfolio.request",
            http.method = %method,
            url = %url,
            authenticated = token.is_some()
        );

        async move {
            let response = self.dispatch(method.clone(), &url, body, token.as_deref()).await?;
            if response.status() != StatusCode::UNAUTHORIZED {
                return decode(response).await;
            }

            debug!("received 401, refreshing access token");
            let fresh = self.refresher.refresh(token.as_deref()).await?;

            let retried = self.dispatch(method, &url, body, Some(&fresh)).await?;
            if retried.status() == StatusCode::UNAUTHORIZED {
                let body = read_body(retried).await.unwrap_or(Value::Null);
                return Err(ClientError::Unauthorized(detail_or_fallback(401, &body)));
            }

            decode(retried).await
        }
        .instrument(span)
        .await
    }

    pub async fn request_as<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T, ClientError> {
        let value = self.request(method, path, body).await?;
        serde_json::from_value(value).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    pub async fn get(&self, path: &str) -> Result<Value, ClientError> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, ClientError> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<Value, ClientError> {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> Result<Value, ClientError> {
        self.request(Method::PATCH, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, ClientError> {
        self.request(Method::DELETE, path, None).await
    }

    /// Unauthenticated call for login, registration and contact forms.
    ///
    /// Never attaches a token and never refreshes; a 401 here is an ordinary
    /// application error such as bad credentials.
    pub async fn send_public(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value, ClientError> {
        let url = self.endpoint(path)?;
        let span = info_span!("portfolio.public", http.method = %method, url = %url);

        async move {
            let response = self.dispatch(method, &url, body, None).await?;
            decode(response).await
        }
        .instrument(span)
        .await
    }

    /// Refresh on demand, treating the currently stored access token as stale.
    pub async fn refresh(&self) -> Result<String, ClientError> {
        let current = self.session.access_token();
        self.refresher.refresh(current.as_deref()).await
    }

    async fn dispatch(
        &self,
        method: Method,
        url: &Url,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<Response, ClientError> {
        let mut request = self.http.request(method, url.clone());

        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        debug!(status = response.status().as_u16(), "response received");
        Ok(response)
    }
}

fn join(base: &Url, path: &str) -> Result<Url, ClientError> {
    base.join(path.trim_start_matches('/'))
        .map_err(|e| ClientError::InvalidRequest(format!("invalid path '{}': {}", path, e)))
}

/// Read a response body as JSON; empty bodies (204, bare 200) read as `null`.
pub(crate) async fn read_body(response: Response) -> Result<Value, ClientError> {
    let status = response.status();
    let text = response.text().await?;

    if text.trim().is_empty() {
        return Ok(Value::Null);
    }

    match serde_json::from_str(&text) {
        Ok(value) => Ok(value),
        // Error pages are often HTML; the status carries the meaning
        Err(_) if !status.is_success() => Ok(Value::Null),
        Err(e) => Err(ClientError::InvalidResponse(format!("response was not valid JSON: {}", e))),
    }
}

async fn decode(response: Response) -> Result<Value, ClientError> {
    let status = response.status();
    let body = read_body(response).await?;

    if status.is_success() {
        Ok(body)
    } else {
        Err(ClientError::application(status.as_u16(), detail_or_fallback(status.as_u16(), &body)))
    }
}
