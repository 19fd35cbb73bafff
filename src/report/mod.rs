//! Collects the outcome of every task of a run and mails a summary.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use derive_more::{Display, Error};

use crate::config::flag;

mod format;
mod mail;
mod render;

pub use format::{format_bytes, format_duration};
pub use mail::{Mail, Mailer, Sendmail};

/// Result of a single task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Ok,
    Info,
    Warning,
    Error,
}

impl Status {
    /// Background color of the status in the mailed report.
    pub fn color(self) -> &'static str {
        match self {
            Self::Info => "#2962FF",
            Self::Ok => "#00C853",
            Self::Warning => "#FFAB00",
            Self::Error => "#D50000",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ok => "OK",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        })
    }
}

/// Kind of a backup task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackupType {
    Directory,
    Database,
    Server,
}

impl BackupType {
    /// All types in the order they appear in the report.
    pub const ALL: [Self; 3] = [Self::Directory, Self::Database, Self::Server];

    pub fn emoji(self) -> &'static str {
        match self {
            Self::Directory => "📁",
            Self::Database => "💿",
            Self::Server => "🖥",
        }
    }

    /// Section heading in the report.
    pub fn heading(self) -> &'static str {
        match self {
            Self::Directory => "Directories",
            Self::Database => "Databases",
            Self::Server => "Servers",
        }
    }

    /// Lower case name used in log messages.
    pub fn noun(self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::Database => "database",
            Self::Server => "server",
        }
    }
}

impl fmt::Display for BackupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Directory => "DIRECTORY",
            Self::Database => "DATABASE",
            Self::Server => "SERVER",
        })
    }
}

/// One row of the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub status: Status,
    pub kind: BackupType,
    /// Configured name of the task.
    pub name: String,
    pub message: String,
    pub file_size: Option<u64>,
    pub duration: Option<Duration>,
}

/// `report` section of the configuration.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ReportSettings {
    #[serde(default)]
    pub sender: Sender,

    #[serde(default)]
    pub subject: String,

    #[serde(default)]
    pub recipients: Vec<Recipient>,

    #[serde(default, deserialize_with = "flag")]
    pub disabled: bool,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Sender {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Recipient {
    pub address: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: RecipientKind,
}

/// Header a [Recipient] is listed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientKind {
    #[default]
    To,
    Cc,
    Bcc,
}

/// Errors on delivery of the [Report].
#[derive(Debug, Display, Error)]
pub enum ReportError {
    #[display("No report is configured")]
    NotConfigured,
    #[display("The report has no recipients")]
    NoRecipients,
    #[display("Failed to start mail transport {}", program.display())]
    Spawn { program: PathBuf, source: io::Error },
    #[display("Failed to hand the report to the mail transport")]
    Write(io::Error),
    #[display("Mail transport {} failed with exit code {exit_code:?}", program.display())]
    Failed {
        program: PathBuf,
        exit_code: Option<i32>,
    },
}

/// Report of one run.
///
/// Entries are only appended. The report is sent once at the end of the run.
pub struct Report {
    settings: Option<ReportSettings>,
    language: Option<String>,
    mailer: Box<dyn Mailer>,
    entries: Vec<Entry>,
}

impl Report {
    pub fn new(
        settings: Option<ReportSettings>,
        language: Option<String>,
        mailer: Box<dyn Mailer>,
    ) -> Self {
        Self {
            settings,
            language,
            mailer,
            entries: Vec::new(),
        }
    }

    /// Whether a report is configured and not disabled.
    pub fn is_enabled(&self) -> bool {
        self.settings
            .as_ref()
            .is_some_and(|settings| !settings.disabled)
    }

    pub fn add(
        &mut self,
        status: Status,
        kind: BackupType,
        name: &str,
        message: String,
        file_size: Option<u64>,
        duration: Option<Duration>,
    ) {
        self.entries.push(Entry {
            status,
            kind,
            name: name.to_string(),
            message,
            file_size,
            duration,
        });
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }

    /// Renders the report as mail.
    pub fn compose(&self) -> Result<Mail, ReportError> {
        let settings = self.settings.as_ref().ok_or(ReportError::NotConfigured)?;
        if settings.recipients.is_empty() {
            return Err(ReportError::NoRecipients);
        }

        let timestamp = chrono::Local::now();
        Ok(render::compose(
            settings,
            self.language.as_deref(),
            &self.entries,
            &timestamp,
        ))
    }

    /// Renders and sends the report.
    pub fn send(&self) -> Result<(), ReportError> {
        let mail = self.compose()?;
        self.mailer.deliver(&mail)
    }
}

impl fmt::Debug for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Report")
            .field("settings", &self.settings)
            .field("language", &self.language)
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}
