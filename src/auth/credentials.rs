use serde::Deserialize;

use crate::auth::source::SourceChain;
use crate::error::DrivePushError;

/// An OAuth client descriptor, as exported from the Google Cloud console.
///
/// The console wraps the client under an `"installed"` or `"web"` key
/// depending on the application type; both carry the same inner fields.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub auth_uri: String,
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientCredentials>,
    web: Option<ClientCredentials>,
}

impl ClientCredentials {
    pub fn from_json(raw: &str) -> Result<Self, String> {
        let file: ClientSecretFile =
            serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {e}"))?;
        let creds = file
            .installed
            .or(file.web)
            .ok_or_else(|| "missing \"installed\" or \"web\" section".to_string())?;
        if creds.client_id.is_empty() || creds.client_secret.is_empty() {
            return Err("client_id and client_secret must be non-empty".to_string());
        }
        Ok(creds)
    }
}

/// Resolve the OAuth client credentials through the precedence chain.
///
/// Absence across all tiers and a present-but-unparseable blob are distinct
/// failures; the latter names the tier it came from.
pub fn resolve_client_credentials(chain: &SourceChain) -> Result<ClientCredentials, DrivePushError> {
    match chain.resolve()? {
        Some(source) => ClientCredentials::from_json(&source.raw).map_err(|detail| {
            DrivePushError::CredentialsMalformed {
                tier: source.origin,
                detail,
            }
        }),
        None => Err(DrivePushError::CredentialsNotFound {
            searched: chain.searched(),
        }),
    }
}
