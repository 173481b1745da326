use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use drivepush::{
    build_session, default_config_dir, resolve_client_credentials, AuthFlow, AuthMode,
    CloudflaredProvider, DriveClient, DrivePushError, SourceChain, SystemBrowser, TokenStore,
};

#[derive(Parser)]
#[command(name = "drivepush", version, about = "Upload a file to Google Drive")]
struct Cli {
    /// File to upload
    file: PathBuf,

    /// Name to give the file in Drive (defaults to the local file name)
    #[arg(long)]
    name: Option<String>,

    /// Destination folder ID (defaults to the Drive root)
    #[arg(long)]
    folder_id: Option<String>,

    /// Shared Drive ID, for folders that live on a Shared Drive
    #[arg(long)]
    drive_id: Option<String>,

    /// Path to the OAuth client credentials JSON
    #[arg(long)]
    credentials: Option<PathBuf>,

    /// Path to the stored token JSON
    #[arg(long)]
    token: Option<PathBuf>,

    /// Authorize through a public tunnel instead of a local browser
    #[arg(long)]
    remote_auth: bool,

    /// Seconds to wait for the authorization callback
    #[arg(long, env = "DRIVEPUSH_AUTH_TIMEOUT_SECS", default_value_t = 300)]
    auth_timeout_secs: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("DRIVEPUSH_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), DrivePushError> {
    // Look at the source file before any network or auth work.
    if !cli.file.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("file to upload does not exist: {}", cli.file.display()),
        )
        .into());
    }
    if cli.file.is_dir() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!(
                "{} is a directory; only single files can be uploaded",
                cli.file.display()
            ),
        )
        .into());
    }

    let config_dir = default_config_dir();
    let credentials_chain = SourceChain::new(
        "credentials",
        "--credentials",
        cli.credentials.clone(),
        "DRIVEPUSH_CREDENTIALS_TEXT",
        "DRIVEPUSH_CREDENTIALS_PATH",
        config_dir.join("credentials.json"),
    );
    let credentials = resolve_client_credentials(&credentials_chain)?;

    let token_chain = SourceChain::new(
        "token",
        "--token",
        cli.token.clone(),
        "DRIVEPUSH_TOKEN_TEXT",
        "DRIVEPUSH_TOKEN_PATH",
        config_dir.join("token.json"),
    );
    let mut store = TokenStore::new(token_chain);

    let mode = if cli.remote_auth {
        AuthMode::Remote {
            tunnel: Box::new(CloudflaredProvider::default()),
        }
    } else {
        AuthMode::Local {
            browser: Box::new(SystemBrowser),
        }
    };
    let flow = AuthFlow::new(
        credentials,
        mode,
        Duration::from_secs(cli.auth_timeout_secs),
    );
    let token = flow.authorize(&mut store).await?;
    let session = build_session(&token)?;

    let client = DriveClient::new(session);
    let uploaded = client
        .upload(
            &cli.file,
            cli.name.as_deref(),
            cli.folder_id.as_deref(),
            cli.drive_id.as_deref(),
        )
        .await?;

    println!("Uploaded '{}' (id {})", uploaded.name, uploaded.id);
    if let Some(link) = uploaded.web_view_link {
        println!("View: {link}");
    }
    Ok(())
}
