use std::path::{Path, PathBuf};

use crate::error::DrivePushError;

/// Where a credential or token blob was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    CliArg,
    EnvText,
    EnvPath,
    DefaultPath,
}

/// A blob resolved from one of the precedence tiers.
///
/// `path` is set for tiers backed by a file; text tiers carry no path and
/// anything persisted on their behalf goes to the chain's default path.
#[derive(Debug, Clone)]
pub struct ResolvedSource {
    pub kind: SourceKind,
    /// Human-readable description of the winning tier, used in error messages.
    pub origin: String,
    pub raw: String,
    pub path: Option<PathBuf>,
}

/// Ordered resolver over the four tiers:
/// CLI path, env var text, env var path, default path.
///
/// The first *present* tier wins; a present tier that cannot be read is a hard
/// error, never a fall-through. The default path is injected so tests can
/// point the chain at a scratch directory.
#[derive(Debug, Clone)]
pub struct SourceChain {
    label: &'static str,
    cli_flag: &'static str,
    cli_path: Option<PathBuf>,
    env_text_var: String,
    env_path_var: String,
    default_path: PathBuf,
}

impl SourceChain {
    pub fn new(
        label: &'static str,
        cli_flag: &'static str,
        cli_path: Option<PathBuf>,
        env_text_var: &str,
        env_path_var: &str,
        default_path: PathBuf,
    ) -> Self {
        Self {
            label,
            cli_flag,
            cli_path,
            env_text_var: env_text_var.to_string(),
            env_path_var: env_path_var.to_string(),
            default_path,
        }
    }

    pub fn default_path(&self) -> &Path {
        &self.default_path
    }

    /// All tiers in precedence order, for "nothing found" error messages.
    pub fn searched(&self) -> String {
        format!(
            "{}, {}, {}, {}",
            self.cli_flag,
            self.env_text_var,
            self.env_path_var,
            self.default_path.display()
        )
    }

    /// Walk the tiers and read the first present one.
    pub fn resolve(&self) -> Result<Option<ResolvedSource>, DrivePushError> {
        if let Some(path) = &self.cli_path {
            let origin = format!("{} path from {}", self.label, self.cli_flag);
            return self.read_file(SourceKind::CliArg, origin, path).map(Some);
        }

        if let Ok(text) = std::env::var(&self.env_text_var) {
            if !text.is_empty() {
                return Ok(Some(ResolvedSource {
                    kind: SourceKind::EnvText,
                    origin: self.env_text_var.clone(),
                    raw: text,
                    path: None,
                }));
            }
        }

        if let Ok(path) = std::env::var(&self.env_path_var) {
            if !path.is_empty() {
                let origin = format!("{} path from {}", self.label, self.env_path_var);
                return self
                    .read_file(SourceKind::EnvPath, origin, Path::new(&path))
                    .map(Some);
            }
        }

        if self.default_path.exists() {
            let origin = format!("default {} path", self.label);
            let path = self.default_path.clone();
            return self
                .read_file(SourceKind::DefaultPath, origin, &path)
                .map(Some);
        }

        Ok(None)
    }

    fn read_file(
        &self,
        kind: SourceKind,
        origin: String,
        path: &Path,
    ) -> Result<ResolvedSource, DrivePushError> {
        if !path.exists() {
            return Err(DrivePushError::SourceUnreadable {
                origin,
                detail: format!("file does not exist: {}", path.display()),
            });
        }
        let raw = std::fs::read_to_string(path).map_err(|e| DrivePushError::SourceUnreadable {
            origin: origin.clone(),
            detail: format!("{}: {e}", path.display()),
        })?;
        Ok(ResolvedSource {
            kind,
            origin,
            raw,
            path: Some(path.to_path_buf()),
        })
    }
}

/// Production base directory for the default credential and token files.
pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".drivepush")
}
