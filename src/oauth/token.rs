use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LifehubError;

/// Credentials obtained from a provider's token endpoint.
///
/// `expires_at` is derived locally from `expires_in` at the moment the token
/// response is received; it is never taken from the provider.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenSet {
    /// Usable as a bearer credential.
    pub fn is_valid(&self) -> bool {
        !self.access_token.is_empty()
    }

    /// Whether the locally-derived expiry has passed. Tokens without an
    /// expiry never report expired; refresh timing is the caller's decision.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => Utc::now() >= expires,
            None => false,
        }
    }
}

/// Raw token response from the provider.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

impl TokenResponse {
    fn into_token_set(self) -> TokenSet {
        let expires_at = self
            .expires_in
            .map(|secs| Utc::now() + chrono::Duration::seconds(secs));
        TokenSet {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_in: self.expires_in,
            expires_at,
            token_type: self.token_type,
            scope: self.scope,
        }
    }
}

/// Exchange an authorization code for tokens.
///
/// `redirect_uri` must be byte-identical to the one used on the authorization
/// URL; providers validate the match.
pub async fn exchange_code(
    token_url: &str,
    client_id: &str,
    client_secret: &str,
    code: &str,
    redirect_uri: &str,
) -> Result<TokenSet, LifehubError> {
    let client = reqwest::Client::new();
    let resp = client
        .post(token_url)
        .form(&[
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ])
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(LifehubError::TokenExchange { status, body });
    }

    let token_resp: TokenResponse = resp.json().await?;
    Ok(token_resp.into_token_set())
}

/// Obtain a fresh access token from a previously issued refresh token.
pub async fn refresh_tokens(
    token_url: &str,
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> Result<TokenSet, LifehubError> {
    let client = reqwest::Client::new();
    let resp = client
        .post(token_url)
        .form(&[
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(LifehubError::TokenRefresh { status, body });
    }

    let token_resp: TokenResponse = resp.json().await?;
    let mut tokens = token_resp.into_token_set();
    // Many providers reuse the refresh token and omit it from the refresh
    // response. Callers persist whatever comes back, so fall back to the
    // input rather than losing the only refresh credential.
    if tokens.refresh_token.is_none() {
        tokens.refresh_token = Some(refresh_token.to_string());
    }
    Ok(tokens)
}
