//! Running-suite ledger -- which suite, if any, has a live environment.
//!
//! The ledger is a small text file (`.suite` by default) so that separate
//! invocations (`setup` now, `test` later) agree on the running suite.
//! A missing or empty file means no suite is running.
//!
//! # Crash safety
//!
//! [`RunningSuiteLedger::write`] writes a sibling temporary file and renames
//! it over the ledger, so a crash leaves either the old value or the new
//! one, never a torn file.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::SuiteError;

/// Persisted record of the running suite.
#[derive(Debug, Clone)]
pub struct RunningSuiteLedger {
    path: PathBuf,
}

impl RunningSuiteLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the running suite.
    ///
    /// Returns `Ok(None)` when the ledger does not exist or is blank.
    ///
    /// # Errors
    ///
    /// Returns `SuiteError::Ledger` if the file exists but cannot be read.
    pub fn read(&self) -> Result<Option<String>, SuiteError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let name = content.trim();
                if name.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(name.to_owned()))
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(self.error(source)),
        }
    }

    /// Record `name` as the running suite.
    pub fn write(&self, name: &str) -> Result<(), SuiteError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.error(e))?;
        }

        let tmp = self.tmp_path();
        let result = (|| -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(name.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp, &self.path)
        })();

        if let Err(source) = result {
            let _ = fs::remove_file(&tmp);
            return Err(self.error(source));
        }

        info!(suite = name, path = %self.path.display(), "running suite recorded");
        Ok(())
    }

    /// Forget the running suite. A missing ledger is not an error.
    pub fn clear(&self) -> Result<(), SuiteError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "running suite cleared");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "ledger already empty");
                Ok(())
            }
            Err(source) => Err(self.error(source)),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| ".suite".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn error(&self, source: std::io::Error) -> SuiteError {
        SuiteError::Ledger {
            path: self.path.clone(),
            source,
        }
    }
}
