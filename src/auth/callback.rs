use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::error::DrivePushError;

/// What the authorization redirect delivered.
#[derive(Debug, PartialEq, Eq)]
enum CallbackOutcome {
    Code(String),
    Denied(String),
    Missing,
}

/// Block on a single loopback callback request and return the authorization
/// code. One accept with a timeout; no listener survives past this call.
pub async fn wait_for_code(port: u16, timeout: Duration) -> Result<String, DrivePushError> {
    let listener = TcpListener::bind(format!("127.0.0.1:{port}"))
        .await
        .map_err(DrivePushError::Io)?;

    let accept_once = async {
        let (mut stream, _) = listener.accept().await?;

        let mut buf = vec![0u8; 4096];
        let n = stream.read(&mut buf).await?;
        let request = String::from_utf8_lossy(&buf[..n]).into_owned();
        let outcome = parse_callback_request(&request);

        let body = match &outcome {
            CallbackOutcome::Code(_) => {
                "<!DOCTYPE html><html><body><h1>Authorization complete.</h1>\
                 <p>You can close this window and return to the terminal.</p></body></html>"
            }
            _ => {
                "<!DOCTYPE html><html><body><h1>Authorization was not granted.</h1>\
                 <p>You can close this window.</p></body></html>"
            }
        };
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await?;
        stream.shutdown().await?;

        Ok::<CallbackOutcome, std::io::Error>(outcome)
    };

    let outcome = tokio::time::timeout(timeout, accept_once)
        .await
        .map_err(|_| DrivePushError::AuthorizationTimeout(timeout.as_secs()))?
        .map_err(DrivePushError::Io)?;

    match outcome {
        CallbackOutcome::Code(code) => Ok(code),
        CallbackOutcome::Denied(reason) => Err(DrivePushError::AuthorizationDenied(reason)),
        CallbackOutcome::Missing => Err(DrivePushError::CallbackMalformed(
            "redirect carried neither a code nor an error".into(),
        )),
    }
}

/// Pull the code or error out of "GET /callback?code=... HTTP/1.1".
fn parse_callback_request(request: &str) -> CallbackOutcome {
    let Some(query) = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|path| path.split('?').nth(1))
    else {
        return CallbackOutcome::Missing;
    };

    let mut error: Option<String> = None;
    for param in query.split('&') {
        if let Some(value) = param.strip_prefix("code=") {
            let decoded = percent_decode(value);
            if !decoded.is_empty() {
                return CallbackOutcome::Code(decoded);
            }
        }
        if let Some(value) = param.strip_prefix("error=") {
            let decoded = percent_decode(value);
            if !decoded.is_empty() {
                error = Some(decoded);
            }
        }
    }

    match error {
        Some(reason) => CallbackOutcome::Denied(reason),
        None => CallbackOutcome::Missing,
    }
}

fn percent_decode(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut bytes = s.bytes();
    while let Some(b) = bytes.next() {
        match b {
            b'%' => match (bytes.next(), bytes.next()) {
                (Some(h), Some(l)) => {
                    let decoded = std::str::from_utf8(&[h, l])
                        .ok()
                        .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                    match decoded {
                        Some(val) => result.push(val as char),
                        None => {
                            result.push('%');
                            result.push(h as char);
                            result.push(l as char);
                        }
                    }
                }
                (Some(h), None) => {
                    result.push('%');
                    result.push(h as char);
                }
                _ => result.push('%'),
            },
            b'+' => result.push(' '),
            _ => result.push(b as char),
        }
    }
    result
}
