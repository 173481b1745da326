//! The Drive API boundary: one multipart file-create call.

use std::path::Path;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

use crate::auth::session::AuthSession;
use crate::error::DrivePushError;

const UPLOAD_API_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Handle to the created remote file.
#[derive(Debug, Deserialize)]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(rename = "webViewLink", default)]
    pub web_view_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    code: u16,
    message: String,
}

pub struct DriveClient {
    session: AuthSession,
    http: reqwest::Client,
    upload_base: String,
}

impl DriveClient {
    pub fn new(session: AuthSession) -> Self {
        Self::with_upload_base(session, UPLOAD_API_BASE)
    }

    /// Base URL override for tests.
    pub fn with_upload_base(session: AuthSession, upload_base: &str) -> Self {
        Self {
            session,
            http: reqwest::Client::new(),
            upload_base: upload_base.trim_end_matches('/').to_string(),
        }
    }

    /// Upload one local file. `drive_id` is passed through for Shared Drive
    /// targets together with `supportsAllDrives`; retries are left to the
    /// caller or the server.
    pub async fn upload(
        &self,
        file_path: &Path,
        name: Option<&str>,
        folder_id: Option<&str>,
        drive_id: Option<&str>,
    ) -> Result<DriveFile, DrivePushError> {
        let filename = match name {
            Some(n) => n.to_string(),
            None => file_path
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
                .ok_or_else(|| {
                    DrivePushError::Upload(
                        format!("cannot derive a file name from {}", file_path.display()).into(),
                    )
                })?,
        };

        let bytes = std::fs::read(file_path)?;
        let mime_type = mime_guess::from_path(file_path)
            .first_or_octet_stream()
            .to_string();

        let mut metadata = serde_json::json!({ "name": filename });
        if let Some(folder) = folder_id {
            metadata["parents"] = serde_json::json!([folder]);
        }
        if let Some(drive) = drive_id {
            metadata["driveId"] = serde_json::json!(drive);
        }

        debug!(file = %file_path.display(), %mime_type, "uploading");

        let metadata_part = Part::text(metadata.to_string())
            .mime_str("application/json")
            .map_err(|e| DrivePushError::Upload(Box::new(e)))?;
        let file_part = Part::bytes(bytes)
            .file_name(filename)
            .mime_str(&mime_type)
            .map_err(|e| DrivePushError::Upload(Box::new(e)))?;
        let form = Form::new()
            .part("metadata", metadata_part)
            .part("file", file_part);

        let response = self
            .http
            .post(format!("{}/files", self.upload_base))
            .bearer_auth(self.session.bearer_token())
            .query(&[
                ("uploadType", "multipart"),
                ("supportsAllDrives", "true"),
                ("fields", "id, name, webViewLink"),
            ])
            .multipart(form)
            .send()
            .await
            .map_err(|e| DrivePushError::Upload(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&body) {
                return Err(DrivePushError::Upload(
                    format!(
                        "API error ({}): {}",
                        api_error.error.code, api_error.error.message
                    )
                    .into(),
                ));
            }
            return Err(DrivePushError::Upload(
                format!("unexpected status {status}: {body}").into(),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| DrivePushError::Upload(Box::new(e)))
    }
}
