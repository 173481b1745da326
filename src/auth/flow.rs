use std::time::Duration;

use tracing::{debug, warn};

use crate::auth::callback::wait_for_code;
use crate::auth::credentials::ClientCredentials;
use crate::auth::pkce::PkcePair;
use crate::auth::store::TokenStore;
use crate::auth::token::{exchange_code, refresh_access_token, TokenRecord};
use crate::auth::tunnel::TunnelProvider;
use crate::error::DrivePushError;

/// Scopes requested for every grant. A stored token missing either is
/// re-authorized rather than used.
pub const DRIVE_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/drive.metadata.readonly",
    "https://www.googleapis.com/auth/drive.file",
];

/// Opens the authorization URL for the user. Returns false when no browser
/// could be launched, in which case the flow prints the URL and keeps waiting.
pub trait BrowserLauncher: Send + Sync {
    fn open(&self, url: &str) -> bool;
}

/// Launcher backed by the OS default browser.
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> bool {
        webbrowser::open(url).is_ok()
    }
}

/// How a new grant reaches a browser: one on this machine, or any machine
/// via a reverse tunnel. Chosen explicitly by the caller, never sniffed
/// from the environment.
pub enum AuthMode {
    Local { browser: Box<dyn BrowserLauncher> },
    Remote { tunnel: Box<dyn TunnelProvider> },
}

#[derive(Debug, PartialEq, Eq)]
enum TokenDisposition {
    Valid,
    Expired,
    Invalid,
}

/// Drives a stored token to a usable one: validate, refresh, or run a full
/// authorization-code grant, persisting every replacement before use.
pub struct AuthFlow {
    credentials: ClientCredentials,
    scopes: Vec<String>,
    timeout: Duration,
    mode: AuthMode,
}

impl AuthFlow {
    pub fn new(credentials: ClientCredentials, mode: AuthMode, timeout: Duration) -> Self {
        Self {
            credentials,
            scopes: DRIVE_SCOPES.iter().map(|s| s.to_string()).collect(),
            timeout,
            mode,
        }
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Resolve, validate, refresh or re-authorize. The returned record is
    /// the one the store just persisted (or the untouched valid one).
    pub async fn authorize(&self, store: &mut TokenStore) -> Result<TokenRecord, DrivePushError> {
        match store.resolve()? {
            None => {
                debug!("no stored token, starting a new authorization");
            }
            Some(token) => match self.disposition(&token) {
                TokenDisposition::Valid => {
                    debug!("stored token is valid");
                    return Ok(token);
                }
                TokenDisposition::Expired => {
                    debug!("access token expired, attempting refresh");
                    match refresh_access_token(&self.credentials.token_uri, &token).await {
                        Ok(fresh) => {
                            store.persist(&fresh)?;
                            return Ok(fresh);
                        }
                        Err(e) => {
                            warn!("refresh failed, falling back to a new authorization: {e}");
                        }
                    }
                }
                TokenDisposition::Invalid => {
                    debug!("stored token is unusable, starting a new authorization");
                }
            },
        }

        let fresh = self.authorize_new().await?;
        store.persist(&fresh)?;
        Ok(fresh)
    }

    fn disposition(&self, token: &TokenRecord) -> TokenDisposition {
        if token.access_token.is_empty() || !token.covers_scopes(&self.scopes) {
            return TokenDisposition::Invalid;
        }
        if !token.is_expired() {
            return TokenDisposition::Valid;
        }
        if token.refresh_token.is_some() {
            TokenDisposition::Expired
        } else {
            TokenDisposition::Invalid
        }
    }

    async fn authorize_new(&self) -> Result<TokenRecord, DrivePushError> {
        // Pick a free port, then release it for the callback listener.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(DrivePushError::Io)?;
        let port = listener.local_addr().map_err(DrivePushError::Io)?.port();
        drop(listener);

        let pkce = PkcePair::generate();

        match &self.mode {
            AuthMode::Local { browser } => {
                let redirect_uri = format!("http://localhost:{port}/callback");
                let auth_url = self.authorization_url(&redirect_uri, &pkce);
                if !browser.open(&auth_url) {
                    warn!("could not open a browser automatically");
                    println!("Open this URL to authorize:\n\n  {auth_url}\n");
                }
                let code = wait_for_code(port, self.timeout).await?;
                exchange_code(
                    &self.credentials,
                    &code,
                    &pkce.verifier,
                    &redirect_uri,
                    &self.scopes,
                )
                .await
            }
            AuthMode::Remote { tunnel: provider } => {
                let mut tunnel = provider.establish(port).await?;
                let redirect_uri =
                    format!("{}/callback", tunnel.public_url().trim_end_matches('/'));
                let auth_url = self.authorization_url(&redirect_uri, &pkce);
                // Printed before blocking so it survives a timeout.
                println!(
                    "Open this URL in a browser on any machine to authorize:\n\n  {auth_url}\n"
                );
                let result = async {
                    let code = wait_for_code(port, self.timeout).await?;
                    exchange_code(
                        &self.credentials,
                        &code,
                        &pkce.verifier,
                        &redirect_uri,
                        &self.scopes,
                    )
                    .await
                }
                .await;
                tunnel.shutdown().await;
                result
            }
        }
    }

    fn authorization_url(&self, redirect_uri: &str, pkce: &PkcePair) -> String {
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}\
             &code_challenge={}&code_challenge_method=S256&access_type=offline&prompt=consent",
            self.credentials.auth_uri,
            percent_encode(&self.credentials.client_id),
            percent_encode(redirect_uri),
            percent_encode(&self.scopes.join(" ")),
            pkce.challenge,
        )
    }
}

fn percent_encode(s: &str) -> String {
    let mut result = String::with_capacity(s.len() * 2);
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(b as char);
            }
            _ => {
                result.push('%');
                result.push_str(&format!("{b:02X}"));
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn credentials() -> ClientCredentials {
        ClientCredentials {
            client_id: "cid".into(),
            client_secret: "cs".into(),
            auth_uri: "https://accounts.google.com/o/oauth2/auth".into(),
            token_uri: "https://oauth2.googleapis.com/token".into(),
            redirect_uris: vec![],
        }
    }

    fn flow() -> AuthFlow {
        AuthFlow::new(
            credentials(),
            AuthMode::Local {
                browser: Box::new(SystemBrowser),
            },
            Duration::from_secs(1),
        )
    }

    fn token(
        access: &str,
        refresh: Option<&str>,
        expiry: Option<chrono::DateTime<Utc>>,
        scopes: &[&str],
    ) -> TokenRecord {
        TokenRecord {
            access_token: access.into(),
            refresh_token: refresh.map(str::to_string),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            expiry,
            client_id: "cid".into(),
            client_secret: "cs".into(),
        }
    }

    #[test]
    fn unexpired_token_with_scopes_is_valid() {
        let t = token(
            "at",
            None,
            Some(Utc::now() + chrono::Duration::hours(1)),
            DRIVE_SCOPES,
        );
        assert_eq!(flow().disposition(&t), TokenDisposition::Valid);
    }

    #[test]
    fn expired_token_with_refresh_is_expired() {
        let t = token(
            "at",
            Some("rt"),
            Some(Utc::now() - chrono::Duration::hours(1)),
            DRIVE_SCOPES,
        );
        assert_eq!(flow().disposition(&t), TokenDisposition::Expired);
    }

    #[test]
    fn expired_token_without_refresh_is_invalid() {
        let t = token(
            "at",
            None,
            Some(Utc::now() - chrono::Duration::hours(1)),
            DRIVE_SCOPES,
        );
        assert_eq!(flow().disposition(&t), TokenDisposition::Invalid);
    }

    #[test]
    fn token_missing_a_scope_is_invalid_even_if_unexpired() {
        let t = token(
            "at",
            Some("rt"),
            Some(Utc::now() + chrono::Duration::hours(1)),
            &["https://www.googleapis.com/auth/drive.file"],
        );
        assert_eq!(flow().disposition(&t), TokenDisposition::Invalid);
    }

    #[test]
    fn empty_access_token_is_invalid() {
        let t = token(
            "",
            Some("rt"),
            Some(Utc::now() + chrono::Duration::hours(1)),
            DRIVE_SCOPES,
        );
        assert_eq!(flow().disposition(&t), TokenDisposition::Invalid);
    }

    #[test]
    fn authorization_url_carries_the_grant_parameters() {
        let f = flow();
        let pkce = PkcePair::generate();
        let url = f.authorization_url("http://localhost:9000/callback", &pkce);
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/auth?"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A9000%2Fcallback"));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains(&format!("code_challenge={}", pkce.challenge)));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("drive.metadata.readonly"));
    }

    #[test]
    fn percent_encoding_reserved_chars() {
        assert_eq!(percent_encode("a b/c"), "a%20b%2Fc");
        assert_eq!(percent_encode("plain-text_1.0~x"), "plain-text_1.0~x");
    }
}
