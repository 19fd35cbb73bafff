//! Backend modules for performing individual backup tasks.
//!
//! Currently the following backends are implemented:
//!
//! - [Directory]: Compressed archive of a local directory (agent mode).
//! - [Database]: Compressed dumps of every schema of a MySQL server (agent mode).
//! - [Server]: Download of the backups of a remote server (manager mode).

pub mod database;
pub mod directory;
pub mod server;

pub use database::Database;
pub use directory::Directory;
pub use server::Server;

use std::path::PathBuf;

use derive_more::{Display, Error};

use crate::report::{BackupType, Status};
use crate::tool::{Runner, Tool};

/// A configured value which can't be handed to the external tools.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum ValidationError {
    #[display("source \"{}\" must be an absolute path", _0.display())]
    RelativeSource(#[error(ignore)] PathBuf),
    #[display("{field} \"{value}\" contains unsupported characters")]
    UnsafeToken { field: &'static str, value: String },
}

/// Generic backup backend.
///
/// Every configured task is one value implementing [Backup].
pub trait Backup {
    /// Error that may happen on backup.
    type Error: std::error::Error + 'static;

    /// Kind of backup, used for logging and the report.
    const TYPE: BackupType;

    /// Configured name of the task.
    fn name(&self) -> &str;

    /// Disabled tasks are reported but never executed.
    fn is_disabled(&self) -> bool;

    /// Checks the task for values which can't be handed to the external tools.
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Backups data managed by the implementation.
    fn backup<R: Runner>(&self, tool: &Tool<R>) -> Result<Outcome, Self::Error>;
}

/// Result of a backup which ran to its end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: Status,
    pub message: String,
    pub file_size: Option<u64>,
}

impl Outcome {
    pub fn ok() -> Self {
        Self {
            status: Status::Ok,
            message: String::new(),
            file_size: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            status: Status::Warning,
            message: message.into(),
            file_size: None,
        }
    }

    pub fn with_file_size(mut self, file_size: Option<u64>) -> Self {
        self.file_size = file_size;
        self
    }
}

pub(crate) fn default_target() -> String {
    String::from("/")
}

/// Missing, `null` or empty targets fall back to the target root.
pub(crate) fn target<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let target: Option<String> = serde::Deserialize::deserialize(deserializer)?;
    Ok(target
        .filter(|target| !target.is_empty())
        .unwrap_or_else(default_target))
}
