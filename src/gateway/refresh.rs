//! Exchange of a refresh token for a new access token.
//!
//! Concurrent 401s share one in-flight exchange. The exchange is keyed by the
//! access token that was rejected, so a caller holding a token that has
//! already been replaced picks up the current one without touching the
//! network, and at most one refresh request goes out per invalidated token.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info_span, warn, Instrument};
use url::Url;

use super::read_body;
use crate::error::{detail_or_fallback, ClientError};
use crate::session::SessionManager;

pub const REFRESH_PATH: &str = "token/refresh/";

type RefreshFuture = Shared<BoxFuture<'static, Result<String, ClientError>>>;

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(default)]
    access: Option<String>,
    // Only honoured when the backend chooses to rotate
    #[serde(default)]
    refresh: Option<String>,
}

struct InFlight {
    generation: u64,
    stale: Option<String>,
    future: RefreshFuture,
}

pub struct RefreshProtocol {
    http: Client,
    endpoint: Url,
    timeout: Duration,
    session: Arc<SessionManager>,
    in_flight: Mutex<Option<InFlight>>,
    generation: AtomicU64,
}

impl RefreshProtocol {
    pub fn new(http: Client, endpoint: Url, timeout: Duration, session: Arc<SessionManager>) -> Self {
        Self {
            http,
            endpoint,
            timeout,
            session,
            in_flight: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Obtain an access token to replace `stale`, the token the backend just rejected.
    ///
    /// Any failure has already cleared the session by the time it is returned.
    pub async fn refresh(&self, stale: Option<&str>) -> Result<String, ClientError> {
        let (generation, future) = {
            let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);

            if let Some(current) = self.session.access_token() {
                if stale != Some(current.as_str()) {
                    debug!("access token already replaced, reusing it");
                    return Ok(current);
                }
            }

            match slot.as_ref() {
                Some(in_flight) if in_flight.stale.as_deref() == stale => {
                    debug!(generation = in_flight.generation, "joining in-flight refresh");
                    (in_flight.generation, in_flight.future.clone())
                }
                _ => {
                    let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
                    let future = exchange(
                        self.http.clone(),
                        self.endpoint.clone(),
                        self.timeout,
                        self.session.clone(),
                    )
                    .boxed()
                    .shared();

                    *slot = Some(InFlight {
                        generation,
                        stale: stale.map(str::to_string),
                        future: future.clone(),
                    });
                    (generation, future)
                }
            }
        };

        let outcome = future.await;

        let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().map(|f| f.generation) == Some(generation) {
            *slot = None;
        }

        outcome
    }
}

async fn exchange(
    http: Client,
    endpoint: Url,
    timeout: Duration,
    session: Arc<SessionManager>,
) -> Result<String, ClientError> {
    let Some(refresh_token) = session.refresh_token() else {
        warn!("no refresh token stored, clearing session");
        session.clear_tokens();
        return Err(ClientError::NoRefreshToken);
    };

    let span = info_span!("portfolio.refresh", http.method = "POST", url = %endpoint);

    match request_access_token(&http, &endpoint, timeout, &refresh_token)
        .instrument(span)
        .await
    {
        Ok(tokens) => {
            let refresh = tokens.refresh.unwrap_or(refresh_token);
            session.set_tokens(tokens.access.clone(), refresh);
            debug!("access token refreshed");
            Ok(tokens.access)
        }
        Err(e) => {
            warn!("token refresh failed, clearing session: {}", e);
            session.clear_tokens();
            Err(e)
        }
    }
}

struct IssuedTokens {
    access: String,
    refresh: Option<String>,
}

async fn request_access_token(
    http: &Client,
    endpoint: &Url,
    timeout: Duration,
    refresh_token: &str,
) -> Result<IssuedTokens, ClientError> {
    let response = http
        .post(endpoint.clone())
        .timeout(timeout)
        .json(&RefreshRequest { refresh: refresh_token })
        .send()
        .await
        .map_err(|e| ClientError::RefreshFailed(ClientError::from(e).to_string()))?;

    let status = response.status();
    let body = read_body(response)
        .await
        .map_err(|e| ClientError::RefreshFailed(e.to_string()))?;

    if !status.is_success() {
        return Err(ClientError::RefreshFailed(detail_or_fallback(status.as_u16(), &body)));
    }

    let payload: RefreshResponse = serde_json::from_value(body)
        .map_err(|e| ClientError::RefreshFailed(format!("malformed refresh response: {}", e)))?;

    let access = payload
        .access
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ClientError::RefreshFailed("No access token in refresh response".to_string()))?;

    Ok(IssuedTokens {
        access,
        refresh: payload.refresh.filter(|token| !token.is_empty()),
    })
}
