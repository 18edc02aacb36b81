// OAuth authorization-code flow against the SmartThings token endpoint.
//
// The authorize URL is opened by the user in a browser; the resulting code is
// exchanged for a token set. Refreshes use the same endpoint with
// `grant_type=refresh_token`. Client credentials travel as HTTP Basic auth.

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use url::Url;

use crate::auth::{TokenResponse, TokenSet};
use crate::error::Error;
use crate::transport::TransportConfig;

pub const AUTHORIZE_URL: &str = "https://api.smartthings.com/oauth/authorize";
pub const TOKEN_URL: &str = "https://api.smartthings.com/oauth/token";
pub const REDIRECT_URI: &str = "https://bitfocus.github.io/companion-oauth/callback";

/// Build the URL a user opens to grant access.
///
/// Runs of whitespace in `scopes` collapse to a single space.
pub fn authorize_url(client_id: &str, scopes: &str, state: &str) -> Result<Url, Error> {
    let scope = scopes.split_whitespace().collect::<Vec<_>>().join(" ");
    let url = Url::parse_with_params(
        AUTHORIZE_URL,
        &[
            ("response_type", "code"),
            ("client_id", client_id),
            ("redirect_uri", REDIRECT_URI),
            ("scope", scope.as_str()),
            ("state", state),
        ],
    )?;
    Ok(url)
}

/// Token endpoint client holding the app's client credentials.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: reqwest::Client,
    token_url: Url,
    client_id: String,
    client_secret: SecretString,
}

impl OAuthClient {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            token_url: Url::parse(TOKEN_URL)?,
            client_id: client_id.into(),
            client_secret,
        })
    }

    /// Point the client at a different token endpoint.
    pub fn with_token_url(mut self, token_url: Url) -> Self {
        self.token_url = token_url;
        self
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Exchange an authorization code for a token set.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenSet, Error> {
        debug!("exchanging authorization code");
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", REDIRECT_URI),
        ])
        .await
    }

    /// Trade a refresh token for a new token set.
    pub async fn refresh(&self, refresh_token: &SecretString) -> Result<TokenSet, Error> {
        debug!("refreshing access token");
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.expose_secret()),
        ])
        .await
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenSet, Error> {
        let resp = self
            .http
            .post(self.token_url.clone())
            .basic_auth(&self.client_id, Some(self.client_secret.expose_secret()))
            .form(form)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(Error::TokenExchange {
                status: status.as_u16(),
                message: if body.is_empty() {
                    status.to_string()
                } else {
                    body
                },
            });
        }

        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: body.clone(),
            })?;
        Ok(TokenSet::from(token))
    }
}
