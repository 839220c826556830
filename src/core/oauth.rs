//! One-time OAuth2 authorization-code exchange used by setup tooling to
//! obtain the long-lived bearer token the storage backend runs with.

use crate::core::wire::TokenResponse;
use crate::utils::error::{Result, StoreError};
use crate::utils::validation::{validate_non_empty_string, validate_url, Validate};
use reqwest::{Client, StatusCode};
use url::Url;

pub const DEFAULT_AUTHORIZE_URL: &str = "https://www.dropbox.com/oauth2/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://api.dropboxapi.com/oauth2/token";

#[derive(Debug, Clone)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: String,
    pub token_url: String,
    client: Client,
}

impl OAuthClient {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            client: Client::new(),
        }
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// Page the account owner visits to obtain an authorization code.
    pub fn authorization_page(&self) -> Result<String> {
        let mut url = Url::parse(&self.authorize_url).map_err(|e| {
            StoreError::InvalidConfigValueError {
                field: "authorize_url".to_string(),
                value: self.authorize_url.clone(),
                reason: e.to_string(),
            }
        })?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("response_type", "code");
        Ok(url.to_string())
    }

    /// Trades an authorization code for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<String> {
        const OP: &str = "oauth.exchange";

        self.validate()?;
        validate_non_empty_string("authorization_code", code)?;

        tracing::debug!("{}: POST {}", OP, self.token_url);
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("code", code),
                ("grant_type", "authorization_code"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|source| StoreError::Transport { op: OP, source })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!("{}: error body: {}", OP, body);
            return Err(StoreError::HttpStatus {
                op: OP,
                status: status.to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| StoreError::Transport { op: OP, source })?;
        let token: TokenResponse =
            serde_json::from_slice(&body).map_err(|source| StoreError::Parse { op: OP, source })?;

        if token.access_token.is_empty() {
            return Err(StoreError::ConfigError {
                message: "token endpoint returned an empty access token".to_string(),
            });
        }
        Ok(token.access_token)
    }
}

impl Validate for OAuthClient {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("client_id", &self.client_id)?;
        validate_non_empty_string("client_secret", &self.client_secret)?;
        validate_url("token_url", &self.token_url)?;
        Ok(())
    }
}
