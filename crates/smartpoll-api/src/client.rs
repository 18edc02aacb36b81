// SmartThings REST client
//
// Wraps `reqwest::Client` with base-URL joining, bearer authentication,
// one-shot token refresh on 401, and error-envelope parsing. Endpoint
// methods live in `devices.rs` as inherent methods.

use std::sync::Arc;

use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::TokenSet;
use crate::error::Error;
use crate::oauth::OAuthClient;
use crate::transport::TransportConfig;

pub const DEFAULT_API_URL: &str = "https://api.smartthings.com/v1/";

// ── Error response shape ─────────────────────────────────────────────

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorEnvelope {
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the SmartThings REST API.
///
/// Holds the current [`TokenSet`] in a `watch` channel. When the API answers
/// 401 and an [`OAuthClient`] plus refresh token are available, the token is
/// refreshed once and the request retried; subscribers to
/// [`token_updates`](Self::token_updates) see the new set and can persist it.
pub struct SmartThingsClient {
    http: reqwest::Client,
    base_url: Url,
    tokens: watch::Sender<Arc<TokenSet>>,
    oauth: Option<OAuthClient>,
    refresh_lock: Mutex<()>,
}

impl SmartThingsClient {
    // ── Constructors ─────────────────────────────────────────────────

    pub fn new(
        base_url: &str,
        tokens: TokenSet,
        oauth: Option<OAuthClient>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::from_reqwest(base_url, http, tokens, oauth)
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn from_reqwest(
        base_url: &str,
        http: reqwest::Client,
        tokens: TokenSet,
        oauth: Option<OAuthClient>,
    ) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        let (tokens, _) = watch::channel(Arc::new(tokens));
        Ok(Self {
            http,
            base_url,
            tokens,
            oauth,
            refresh_lock: Mutex::new(()),
        })
    }

    /// Ensure the base path ends with `/` so relative joins append.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Subscribe to token replacements performed by automatic refresh.
    pub fn token_updates(&self) -> watch::Receiver<Arc<TokenSet>> {
        self.tokens.subscribe()
    }

    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {url}");
        let resp = self.send(|| self.http.get(url.clone())).await?;
        Self::handle_response(resp).await
    }

    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, Error> {
        debug!("POST {url}");
        let resp = self.send(|| self.http.post(url.clone()).json(body)).await?;
        Self::handle_response(resp).await
    }

    /// Send with the current bearer token, refreshing once on 401.
    async fn send(
        &self,
        build: impl Fn() -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, Error> {
        let token = self.tokens.borrow().clone();
        let resp = build()
            .bearer_auth(token.access_token.expose_secret())
            .send()
            .await?;

        if resp.status() != StatusCode::UNAUTHORIZED {
            return Ok(resp);
        }

        let Some(fresh) = self.refresh_tokens(&token).await? else {
            return Err(Error::Authentication {
                message: "access token rejected and no refresh token available".into(),
            });
        };

        let retry = build()
            .bearer_auth(fresh.access_token.expose_secret())
            .send()
            .await?;
        if retry.status() == StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication {
                message: "access token rejected after refresh".into(),
            });
        }
        Ok(retry)
    }

    /// Refresh the token set unless another request already replaced `stale`.
    async fn refresh_tokens(&self, stale: &Arc<TokenSet>) -> Result<Option<Arc<TokenSet>>, Error> {
        let Some(oauth) = &self.oauth else {
            return Ok(None);
        };
        let _guard = self.refresh_lock.lock().await;

        let current = self.tokens.borrow().clone();
        if !Arc::ptr_eq(&current, stale) {
            return Ok(Some(current));
        }
        let Some(refresh_token) = &current.refresh_token else {
            return Ok(None);
        };

        let mut fresh = oauth.refresh(refresh_token).await.inspect_err(|e| {
            if e.is_auth_expired() {
                warn!(error = %e, "refresh token rejected, re-authorization required");
            }
        })?;
        if fresh.refresh_token.is_none() {
            fresh.refresh_token = Some(refresh_token.clone());
        }
        let fresh = Arc::new(fresh);
        self.tokens.send_replace(Arc::clone(&fresh));
        info!("access token refreshed");
        Ok(Some(fresh))
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        if !status.is_success() {
            return Err(Self::parse_error(status, resp).await);
        }
        let body = resp.text().await?;
        let body = if body.trim().is_empty() {
            "null".to_owned()
        } else {
            body
        };
        serde_json::from_str(&body).map_err(|e| {
            let preview = body.chars().take(200).collect::<String>();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    }

    async fn parse_error(status: StatusCode, resp: reqwest::Response) -> Error {
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(1);
            return Error::RateLimited { retry_after_secs };
        }

        let raw = resp.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorEnvelope>(&raw) {
            Ok(envelope) => {
                let (code, message) = envelope
                    .error
                    .map(|e| (e.code, e.message))
                    .unwrap_or_default();
                Error::Api {
                    status: status.as_u16(),
                    message: message.unwrap_or_else(|| status.to_string()),
                    code,
                    request_id: envelope.request_id,
                }
            }
            Err(_) => Error::Api {
                status: status.as_u16(),
                message: if raw.is_empty() {
                    status.to_string()
                } else {
                    raw
                },
                code: None,
                request_id: None,
            },
        }
    }
}
