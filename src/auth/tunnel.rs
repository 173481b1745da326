use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::DrivePushError;

/// An established reverse tunnel exposing the local callback listener.
#[async_trait]
pub trait Tunnel: Send {
    fn public_url(&self) -> &str;

    /// Tear the tunnel down. The flow engine calls this exactly once on
    /// every exit path; implementations must tolerate an already-dead peer.
    async fn shutdown(&mut self);
}

/// Capability handed to the flow engine when no local browser is available.
#[async_trait]
pub trait TunnelProvider: Send + Sync {
    async fn establish(&self, local_port: u16) -> Result<Box<dyn Tunnel>, DrivePushError>;
}

/// Tunnel backed by a `cloudflared` quick tunnel subprocess.
///
/// cloudflared announces the assigned public hostname on stderr shortly
/// after startup; we scrape it from there.
pub struct CloudflaredTunnel {
    child: Child,
    public_url: String,
}

#[async_trait]
impl Tunnel for CloudflaredTunnel {
    fn public_url(&self) -> &str {
        &self.public_url
    }

    async fn shutdown(&mut self) {
        if let Err(e) = self.child.start_kill() {
            debug!("tunnel process already gone: {e}");
        }
        let _ = self.child.wait().await;
    }
}

impl Drop for CloudflaredTunnel {
    fn drop(&mut self) {
        let _ = self.child.start_kill();
    }
}

pub struct CloudflaredProvider {
    binary: String,
    url_wait: Duration,
}

impl Default for CloudflaredProvider {
    fn default() -> Self {
        Self {
            binary: "cloudflared".to_string(),
            url_wait: Duration::from_secs(30),
        }
    }
}

#[async_trait]
impl TunnelProvider for CloudflaredProvider {
    async fn establish(&self, local_port: u16) -> Result<Box<dyn Tunnel>, DrivePushError> {
        let mut child = Command::new(&self.binary)
            .args([
                "tunnel",
                "--url",
                &format!("http://127.0.0.1:{local_port}"),
                "--no-autoupdate",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                DrivePushError::TunnelEstablish(format!(
                    "failed to start {}: {e} (is it installed and on PATH?)",
                    self.binary
                ))
            })?;

        let stderr = child.stderr.take().ok_or_else(|| {
            DrivePushError::TunnelEstablish("could not capture tunnel process output".into())
        })?;
        let mut lines = BufReader::new(stderr).lines();

        let scrape = async {
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(target: "tunnel", "{line}");
                if let Some(url) = parse_public_url(&line) {
                    return Some(url);
                }
            }
            None
        };

        let url = match tokio::time::timeout(self.url_wait, scrape).await {
            Ok(Some(url)) => url,
            Ok(None) => {
                let _ = child.start_kill();
                return Err(DrivePushError::TunnelEstablish(format!(
                    "{} exited before announcing a public URL",
                    self.binary
                )));
            }
            Err(_) => {
                let _ = child.start_kill();
                return Err(DrivePushError::TunnelEstablish(format!(
                    "no public URL announced within {}s",
                    self.url_wait.as_secs()
                )));
            }
        };

        // Keep draining stderr so the child never blocks on a full pipe.
        tokio::spawn(async move {
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(target: "tunnel", "{line}");
            }
        });

        debug!("tunnel established at {url}");
        if !url.starts_with("https://") {
            warn!("tunnel URL is not HTTPS; the authorization redirect may be rejected");
        }

        Ok(Box::new(CloudflaredTunnel {
            child,
            public_url: url,
        }))
    }
}

/// Pick the quick-tunnel hostname out of a cloudflared log line.
fn parse_public_url(line: &str) -> Option<String> {
    let start = line.find("https://")?;
    let rest = &line[start..];
    let end = rest
        .find(|c: char| c.is_whitespace() || c == '|')
        .unwrap_or(rest.len());
    let url = &rest[..end];
    if url.contains(".trycloudflare.com") {
        Some(url.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrapes_url_from_banner_line() {
        let line = "2026-08-05T10:00:00Z INF |  https://odd-words-here.trycloudflare.com  |";
        assert_eq!(
            parse_public_url(line),
            Some("https://odd-words-here.trycloudflare.com".to_string())
        );
    }

    #[test]
    fn ignores_unrelated_https_urls() {
        let line = "INF Visit https://developers.cloudflare.com/argo-tunnel/ for docs";
        assert_eq!(parse_public_url(line), None);
    }

    #[test]
    fn ignores_lines_without_urls() {
        assert_eq!(parse_public_url("INF Starting tunnel"), None);
    }

    #[test]
    fn url_at_end_of_line() {
        let line = "INF assigned https://a-b-c.trycloudflare.com";
        assert_eq!(
            parse_public_url(line),
            Some("https://a-b-c.trycloudflare.com".to_string())
        );
    }

    #[tokio::test]
    async fn missing_binary_is_an_establish_error() {
        let provider = CloudflaredProvider {
            binary: "definitely-not-a-real-tunnel-binary".into(),
            url_wait: Duration::from_secs(1),
        };
        let err = match provider.establish(1234).await {
            Err(e) => e,
            Ok(_) => panic!("expected establish to fail"),
        };
        assert!(matches!(err, DrivePushError::TunnelEstablish(_)));
        assert!(err.to_string().contains("is it installed"));
    }
}
