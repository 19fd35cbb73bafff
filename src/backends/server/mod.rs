//! Implements the download of backups from remote servers using [Server].

use std::path::PathBuf;
use std::sync::LazyLock;

use derive_more::{Display, Error};
use regex::Regex;

use super::{default_target, target, Backup, Outcome, ValidationError};
use crate::config::flag;
use crate::report::BackupType;
use crate::tool::{Runner, Tool, ToolError};

mod download;

pub use download::download_command;

// user and host end up unquoted in the `user@host:` token of rsync
static USER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("user pattern should be valid"));
static HOST_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._:\[\]-]+$").expect("host pattern should be valid"));

/// A remote server whose `source` directory is pulled via `rsync` and `ssh`.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Server {
    pub name: String,

    /// Host name or address of the server.
    pub host: String,

    /// Remote directory holding the backups.
    pub source: String,

    /// Directory below the target root receiving the download.
    #[serde(default = "default_target", deserialize_with = "target")]
    pub target: String,

    pub ssh: Ssh,

    #[serde(default, deserialize_with = "flag")]
    pub disabled: bool,
}

/// SSH connection settings of a [Server].
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Ssh {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_user")]
    pub user: String,

    /// Private key used for authentication.
    pub key: PathBuf,

    /// Passphrase of the key. Can't be handed to a non-interactive `ssh`.
    #[serde(default)]
    pub passphrase: String,
}

fn default_port() -> u16 {
    22
}

fn default_user() -> String {
    String::from("root")
}

/// Errors on download from a [Server].
#[derive(Debug, Display, Error)]
pub enum DownloadError {
    #[display("Failed to create target directory for server \"{name}\".")]
    TargetDirectory { name: String, source: ToolError },
    #[display("Failed to download from server \"{name}\".")]
    Download { name: String, source: ToolError },
    #[display("Download from server \"{name}\" left no target directory {}.", path.display())]
    TargetMissing { name: String, path: PathBuf },
}

impl Backup for Server {
    type Error = DownloadError;

    const TYPE: BackupType = BackupType::Server;

    fn name(&self) -> &str {
        &self.name
    }

    fn is_disabled(&self) -> bool {
        self.disabled
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if !USER_PATTERN.is_match(&self.ssh.user) {
            return Err(ValidationError::UnsafeToken {
                field: "ssh user",
                value: self.ssh.user.clone(),
            });
        }
        if !HOST_PATTERN.is_match(&self.host) {
            return Err(ValidationError::UnsafeToken {
                field: "host",
                value: self.host.clone(),
            });
        }
        // the key is quoted inside the double quoted `-e` argument
        let key = self.ssh.key.to_string_lossy();
        if key.contains(['"', '$', '`', '\\']) {
            return Err(ValidationError::UnsafeToken {
                field: "ssh key path",
                value: key.into_owned(),
            });
        }
        Ok(())
    }

    fn backup<R: Runner>(&self, tool: &Tool<R>) -> Result<Outcome, Self::Error> {
        let name = &self.name;

        let local_target = tool
            .create_directory(&self.target)
            .map_err(|source| DownloadError::TargetDirectory {
                name: name.clone(),
                source,
            })?;

        if !self.ssh.passphrase.is_empty() {
            log::warn!(target: "app", "The passphrase of server \"{name}\" can't be passed to ssh, load the key into an ssh-agent instead.");
        }

        let command = download_command(self, &local_target.to_string_lossy());
        tool.execute(&command)
            .map_err(|source| DownloadError::Download {
                name: name.clone(),
                source,
            })?;

        if !tool.is_dry_run() && !local_target.is_dir() {
            return Err(DownloadError::TargetMissing {
                name: name.clone(),
                path: local_target,
            });
        }

        log::info!(target: "app", "Archive \"{name}\" downloaded from server.");
        Ok(Outcome::ok())
    }
}
