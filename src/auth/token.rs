use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::credentials::ClientCredentials;
use crate::error::DrivePushError;

/// Leeway subtracted from the expiry so a token that is about to lapse is
/// refreshed instead of failing mid-upload.
const EXPIRY_LEEWAY_SECS: i64 = 60;

/// A stored OAuth user token. Replaced wholesale on every refresh or grant.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TokenRecord {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub scopes: Vec<String>,
    pub expiry: Option<DateTime<Utc>>,
    pub client_id: String,
    pub client_secret: String,
}

impl TokenRecord {
    pub fn is_expired(&self) -> bool {
        match self.expiry {
            Some(expiry) => Utc::now() + chrono::Duration::seconds(EXPIRY_LEEWAY_SECS) >= expiry,
            None => false,
        }
    }

    pub fn covers_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|s| self.scopes.contains(s))
    }
}

/// Raw token-endpoint response body.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    scope: Option<String>,
}

impl TokenResponse {
    /// Build a full record, falling back to prior values where the endpoint
    /// omits fields (Google leaves out `refresh_token` on refresh responses).
    fn into_record(
        self,
        client_id: &str,
        client_secret: &str,
        fallback_scopes: &[String],
        fallback_refresh: Option<String>,
    ) -> TokenRecord {
        let expiry = self
            .expires_in
            .map(|secs| Utc::now() + chrono::Duration::seconds(secs));
        let scopes = match self.scope {
            Some(ref s) if !s.is_empty() => split_scopes(s),
            _ => fallback_scopes.to_vec(),
        };
        TokenRecord {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(fallback_refresh),
            scopes,
            expiry,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        }
    }
}

fn split_scopes(scope: &str) -> Vec<String> {
    scope.split_whitespace().map(str::to_string).collect()
}

/// Exchange an authorization code for a token at the client's token endpoint.
pub async fn exchange_code(
    credentials: &ClientCredentials,
    code: &str,
    code_verifier: &str,
    redirect_uri: &str,
    requested_scopes: &[String],
) -> Result<TokenRecord, DrivePushError> {
    let client = reqwest::Client::new();
    let resp = client
        .post(&credentials.token_uri)
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("code_verifier", code_verifier),
            ("redirect_uri", redirect_uri),
            ("client_id", &credentials.client_id),
            ("client_secret", &credentials.client_secret),
        ])
        .send()
        .await
        .map_err(|e| DrivePushError::TokenExchange(format!("request failed: {e}")))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(DrivePushError::TokenExchange(format!(
            "status {status}: {body}"
        )));
    }

    let token_resp: TokenResponse = resp
        .json()
        .await
        .map_err(|e| DrivePushError::TokenExchange(format!("unparseable response: {e}")))?;

    Ok(token_resp.into_record(
        &credentials.client_id,
        &credentials.client_secret,
        requested_scopes,
        None,
    ))
}

/// Trade a refresh token for a new access token.
///
/// Every failure maps to `TokenRefreshRejected`; the flow engine recovers
/// from it by starting a fresh grant, so nothing here is fatal on its own.
pub async fn refresh_access_token(
    token_endpoint: &str,
    current: &TokenRecord,
) -> Result<TokenRecord, DrivePushError> {
    let refresh = current
        .refresh_token
        .as_deref()
        .ok_or_else(|| DrivePushError::TokenRefreshRejected("no refresh token held".into()))?;

    let client = reqwest::Client::new();
    let resp = client
        .post(token_endpoint)
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh),
            ("client_id", &current.client_id),
            ("client_secret", &current.client_secret),
        ])
        .send()
        .await
        .map_err(|e| DrivePushError::TokenRefreshRejected(format!("request failed: {e}")))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(DrivePushError::TokenRefreshRejected(format!(
            "status {status}: {body}"
        )));
    }

    let token_resp: TokenResponse = resp
        .json()
        .await
        .map_err(|e| DrivePushError::TokenRefreshRejected(format!("unparseable response: {e}")))?;

    Ok(token_resp.into_record(
        &current.client_id,
        &current.client_secret,
        &current.scopes,
        current.refresh_token.clone(),
    ))
}
