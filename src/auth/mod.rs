pub mod callback;
pub mod credentials;
pub mod flow;
pub mod pkce;
pub mod session;
pub mod source;
pub mod store;
pub mod token;
pub mod tunnel;

pub use credentials::{resolve_client_credentials, ClientCredentials};
pub use flow::{AuthFlow, AuthMode, BrowserLauncher, SystemBrowser, DRIVE_SCOPES};
pub use session::{build_session, AuthSession};
pub use source::{default_config_dir, ResolvedSource, SourceChain, SourceKind};
pub use store::TokenStore;
pub use token::TokenRecord;
pub use tunnel::{CloudflaredProvider, Tunnel, TunnelProvider};
