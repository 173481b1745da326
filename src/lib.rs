pub mod auth;
pub mod drive;
pub mod error;

pub use auth::{
    build_session, default_config_dir, resolve_client_credentials, AuthFlow, AuthMode,
    AuthSession, BrowserLauncher, ClientCredentials, CloudflaredProvider, SourceChain,
    SystemBrowser, TokenRecord, TokenStore, Tunnel, TunnelProvider, DRIVE_SCOPES,
};
pub use drive::{DriveClient, DriveFile};
pub use error::DrivePushError;
