use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::{
    domain::Session,
    error::{JoinError, Result},
};

/// Local durable record of the logged-in user
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_parent_exists(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }

    /// Returns the stored session, or `None` for a guest
    pub async fn load(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No session file, continuing as guest");
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path).await?;
        let session: Session = serde_json::from_str(&contents)
            .map_err(|err| JoinError::malformed(self.path.display().to_string(), err))?;

        Ok(Some(session))
    }

    pub async fn save(&self, session: &Session) -> Result<()> {
        self.ensure_parent_exists().await?;

        let json = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, json).await?;

        info!(username = %session.username, "Session saved");
        Ok(())
    }

    /// Logging out; clearing an absent session is fine
    pub async fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).await?;
            info!("Session cleared");
        }
        Ok(())
    }
}
