use std::path::PathBuf;

use tracing::warn;

use crate::auth::source::SourceChain;
use crate::auth::token::TokenRecord;
use crate::error::DrivePushError;

/// Owns the stored token for the duration of a run: resolves it through the
/// precedence chain and writes replacements back to the location that won.
///
/// A token resolved from a text tier has no file behind it, so persistence
/// falls back to the chain's default path.
pub struct TokenStore {
    chain: SourceChain,
    write_path: Option<PathBuf>,
}

impl TokenStore {
    pub fn new(chain: SourceChain) -> Self {
        Self {
            chain,
            write_path: None,
        }
    }

    /// Resolve a stored token, or `None` on a first run.
    ///
    /// A token file this tool owns and will overwrite anyway is not worth
    /// dying over: unparseable contents are logged and treated as no token.
    pub fn resolve(&mut self) -> Result<Option<TokenRecord>, DrivePushError> {
        let Some(source) = self.chain.resolve()? else {
            return Ok(None);
        };
        if let Some(path) = &source.path {
            self.write_path = Some(path.clone());
        }
        match serde_json::from_str::<TokenRecord>(&source.raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(origin = %source.origin, "stored token is unreadable, re-authorizing: {e}");
                Ok(None)
            }
        }
    }

    /// Where a persisted token will land, given what resolution found.
    pub fn write_path(&self) -> PathBuf {
        self.write_path
            .clone()
            .unwrap_or_else(|| self.chain.default_path().to_path_buf())
    }

    pub fn persist(&self, record: &TokenRecord) -> Result<(), DrivePushError> {
        let path = self.write_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DrivePushError::TokenPersist {
                path: path.clone(),
                detail: e.to_string(),
            })?;
        }
        let data = serde_json::to_string_pretty(record).map_err(|e| DrivePushError::TokenPersist {
            path: path.clone(),
            detail: e.to_string(),
        })?;
        std::fs::write(&path, data).map_err(|e| DrivePushError::TokenPersist {
            path,
            detail: e.to_string(),
        })
    }
}
