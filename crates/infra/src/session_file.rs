//! On-disk session persistence
//!
//! Keeps the signed-in session between CLI invocations, the way the hosted
//! browser client keeps it in local storage. The file holds the session as
//! JSON, is readable by the owner only, and is removed on sign-out.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use rentkenya_domain::{RentalError, Result, Session};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::errors::InfraError;

#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored session.
    ///
    /// A missing file is "signed out". An unreadable one is discarded with a
    /// warning rather than blocking startup.
    ///
    /// # Errors
    /// Returns `RentalError::Config` if the file exists but cannot be read.
    pub fn load(&self) -> Result<Option<Session>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(RentalError::Config(format!(
                    "cannot read session file {}: {err}",
                    self.path.display()
                )))
            }
        };

        match serde_json::from_str::<Session>(&contents) {
            Ok(session) => {
                debug!(path = %self.path.display(), user_id = %session.user_id(), "session restored");
                Ok(Some(session))
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "discarding unreadable session file");
                Ok(None)
            }
        }
    }

    /// Write `session`, or remove the file when there is none.
    ///
    /// The JSON goes to a temporary file next to the target which is then
    /// renamed over it, so readers see the old session or the new one.
    ///
    /// # Errors
    /// Returns `RentalError::Config` if the file cannot be written or removed.
    pub fn save(&self, session: Option<&Session>) -> Result<()> {
        let Some(session) = session else {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
                Err(err) => Err(self.io_error("remove", &err)),
            };
        };

        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                fs::create_dir_all(parent)
                    .map_err(|err| self.io_error("create directory for", &err))?;
                parent
            }
            None => Path::new("."),
        };
        let json = serde_json::to_vec_pretty(session)
            .map_err(|err| RentalError::from(InfraError::from(err)))?;

        let mut staged = NamedTempFile::new_in(dir).map_err(|err| self.io_error("stage", &err))?;
        restrict_to_owner(staged.as_file()).map_err(|err| self.io_error("protect", &err))?;
        staged.write_all(&json).map_err(|err| self.io_error("write", &err))?;
        staged.as_file().sync_all().map_err(|err| self.io_error("flush", &err))?;
        staged.persist(&self.path).map_err(|err| self.io_error("replace", &err.error))?;

        debug!(path = %self.path.display(), user_id = %session.user_id(), "session saved");
        Ok(())
    }

    fn io_error(&self, action: &str, err: &std::io::Error) -> RentalError {
        RentalError::Config(format!("cannot {action} session file {}: {err}", self.path.display()))
    }
}

#[cfg(unix)]
fn restrict_to_owner(file: &fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    file.set_permissions(fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_to_owner(_file: &fs::File) -> std::io::Result<()> {
    Ok(())
}
