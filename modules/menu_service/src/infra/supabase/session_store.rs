//! Session file kept between runs

use super::dto::StoredSession;
use crate::contract::Session;
use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// JSON file holding the last signed-in session
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when nothing has been stored yet
    pub fn load(&self) -> Result<Option<Session>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read {}", self.path.display()))
            }
        };

        let stored: StoredSession = serde_json::from_slice(&bytes)
            .with_context(|| format!("malformed session file {}", self.path.display()))?;
        Ok(Some(stored.into()))
    }

    /// Replace the stored session. The file is written next to the target
    /// and renamed over it.
    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }

        let body = serde_json::to_vec_pretty(&StoredSession::from(session))
            .context("failed to encode session")?;
        let staging = self.path.with_extension("tmp");
        std::fs::write(&staging, body)
            .with_context(|| format!("failed to write {}", staging.display()))?;
        restrict_permissions(&staging)?;
        std::fs::rename(&staging, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))
    }

    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to remove {}", self.path.display())),
        }
    }
}

// Tokens in the file are bearer credentials
#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .with_context(|| format!("failed to restrict {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
