use chrono::Utc;
use secrecy::SecretString;
use serde::Deserialize;

/// Bearer credentials for the SmartThings API.
///
/// A personal access token carries only `access_token`. Tokens obtained
/// through the OAuth flow also carry a refresh token and an absolute expiry
/// (epoch seconds), and are replaced wholesale on every refresh.
#[derive(Debug, Clone)]
pub struct TokenSet {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub expires_at: Option<i64>,
}

impl TokenSet {
    /// A long-lived personal access token with no refresh capability.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::from(token.into()),
            refresh_token: None,
            expires_at: None,
        }
    }

    /// Whether the access token is past its expiry (never, when unknown).
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|at| Utc::now().timestamp() >= at)
    }
}

/// Raw `/oauth/token` response body.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl From<TokenResponse> for TokenSet {
    fn from(resp: TokenResponse) -> Self {
        Self {
            access_token: SecretString::from(resp.access_token),
            refresh_token: resp.refresh_token.map(SecretString::from),
            expires_at: Some(Utc::now().timestamp() + resp.expires_in.unwrap_or(0)),
        }
    }
}
