use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DrivePushError {
    #[error("No OAuth client credentials found. Checked: {searched}")]
    CredentialsNotFound { searched: String },

    #[error("Credentials from {tier} are not a usable OAuth client: {detail}")]
    CredentialsMalformed { tier: String, detail: String },

    #[error("{origin}: {detail}")]
    SourceUnreadable { origin: String, detail: String },

    #[error("Failed to write token to {}: {detail}", path.display())]
    TokenPersist { path: PathBuf, detail: String },

    #[error("Authorization was denied: {0}")]
    AuthorizationDenied(String),

    #[error("Timed out after {0}s waiting for the authorization callback")]
    AuthorizationTimeout(u64),

    #[error("Could not establish the authorization tunnel: {0}")]
    TunnelEstablish(String),

    #[error("Token refresh failed: {0}")]
    TokenRefreshRejected(String),

    #[error("Token endpoint rejected the request: {0}")]
    TokenExchange(String),

    #[error("Malformed authorization callback: {0}")]
    CallbackMalformed(String),

    #[error("Token record is unusable: {0}")]
    InvalidTokenRecord(String),

    #[error("Upload failed: {0}")]
    Upload(Box<dyn std::error::Error + Send + Sync>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
