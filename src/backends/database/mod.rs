//! Implements backup of MySQL databases using [Database].
//!
//! Every user schema of the server is dumped and archived on its own, so
//! one broken schema doesn't prevent the backup of its siblings.

use std::path::PathBuf;

use derive_more::{Display, Error};

use super::{default_target, target, Backup, Outcome};
use crate::config::flag;
use crate::report::BackupType;
use crate::tool::{ArchiveJob, Runner, Tool, ToolError};
use crate::util::{error_chain, sanitize};

pub mod command;
mod source;

pub use source::{Credentials, DatabaseSource, MissingContainer};

const ARCHIVE_EXTENSION: &str = ".sql.bz2";

/// A MySQL server whose schemata are dumped into `<name>.<schema>.sql.bz2`.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Database {
    pub name: String,

    #[serde(default)]
    pub source: DatabaseSource,

    /// Directory below the target root receiving the archives.
    #[serde(default = "default_target", deserialize_with = "target")]
    pub target: String,

    #[serde(default, deserialize_with = "flag")]
    pub disabled: bool,
}

/// Errors on backup of a [Database].
#[derive(Debug, Display, Error)]
pub enum DatabaseError {
    #[display("Failed to create target directory for database backup \"{name}\".")]
    TargetDirectory { name: String, source: ToolError },
    #[display("Failed to get schemata for database backup \"{name}\".")]
    Schemata { name: String, source: ToolError },
    #[display("Failed to create dump for schema \"{schema}\" of database backup \"{name}\".")]
    Dump {
        name: String,
        schema: String,
        source: ToolError,
    },
    #[display("Failed to create archive for schema \"{schema}\" of database backup \"{name}\".")]
    Archive {
        name: String,
        schema: String,
        source: ToolError,
    },
}

impl Database {
    /// Dumps and archives one schema, returns the path of the archive.
    fn backup_schema<R: Runner>(
        &self,
        tool: &Tool<R>,
        schema: &str,
    ) -> Result<PathBuf, DatabaseError> {
        let prefix = format!("{}.{schema}", sanitize(&self.name));
        let dump = PathBuf::from(format!("{prefix}.sql"));

        let result = tool
            .execute(&command::dump_schema(&self.source, schema, &dump))
            .map_err(|source| DatabaseError::Dump {
                name: self.name.clone(),
                schema: schema.to_string(),
                source,
            })
            .and_then(|_| {
                let job = ArchiveJob {
                    source: dump.clone(),
                    target: self.target.clone(),
                    archive: format!("{prefix}{ARCHIVE_EXTENSION}"),
                };
                tool.create_archive(&job)
                    .map_err(|source| DatabaseError::Archive {
                        name: self.name.clone(),
                        schema: schema.to_string(),
                        source,
                    })
            });

        if let Err(e) = tool.remove_file(&dump) {
            log::warn!(target: "app", "Failed to remove dump \"{}\": {e}", dump.display());
        }

        result
    }
}

impl Backup for Database {
    type Error = DatabaseError;

    const TYPE: BackupType = BackupType::Database;

    fn name(&self) -> &str {
        &self.name
    }

    fn is_disabled(&self) -> bool {
        self.disabled
    }

    fn backup<R: Runner>(&self, tool: &Tool<R>) -> Result<Outcome, Self::Error> {
        let name = &self.name;

        tool.create_directory(&self.target)
            .map_err(|source| DatabaseError::TargetDirectory {
                name: name.clone(),
                source,
            })?;

        let output = tool
            .execute(&command::list_schemata(&self.source))
            .map_err(|source| DatabaseError::Schemata {
                name: name.clone(),
                source,
            })?;
        let schemata = command::parse_schemata(&output);

        if schemata.is_empty() {
            log::warn!(target: "app", "No schemata found for database backup \"{name}\".");
            return Ok(Outcome::warning("No schemata found"));
        }
        log::debug!(target: "app", "Found schemata for database backup \"{name}\": {}", schemata.join(", "));

        let mut failed = 0;
        let mut file_size = 0;
        for schema in &schemata {
            match self.backup_schema(tool, schema) {
                Ok(archive) => {
                    file_size += tool.file_size(&archive).unwrap_or_default();
                    log::info!(target: "app", "Archive of schema \"{schema}\" of database \"{name}\" successfully created.");
                }
                Err(e) => {
                    failed += 1;
                    log::error!(target: "app", "{}", error_chain(&e));
                }
            }
        }

        let outcome = if failed == 0 {
            Outcome::ok()
        } else {
            Outcome::warning(format!("{failed} of {} schemata failed", schemata.len()))
        };
        Ok(outcome.with_file_size(Some(file_size)))
    }
}
