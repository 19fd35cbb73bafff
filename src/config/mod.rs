//! Configuration of a backup run.
//!
//! The configuration is read from a JSON file, or from a TOML file if its
//! extension is `.toml`.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Component, Path, PathBuf};

use derive_more::{Display, Error, From};
use serde::{Deserialize, Deserializer};

use crate::backends::{Backup, Database, Directory, Server, ValidationError};
use crate::report::{BackupType, ReportSettings};
use crate::tool::{self, MountError};

const ZONEINFO: &str = "/usr/share/zoneinfo";

/// Role of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Backup of local directories and databases.
    Agent,
    /// Download of backups from remote servers.
    Manager,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Configuration {
    pub mode: Mode,

    /// Timezone of the run, e.g. `Europe/Berlin`.
    #[serde(default)]
    pub timezone: Option<String>,

    /// Language of the report, e.g. `en_US`.
    #[serde(default)]
    pub language: Option<String>,

    #[serde(default, deserialize_with = "flag")]
    pub debug: bool,

    pub target: Target,

    /// Reporting is disabled without a `report` section.
    #[serde(default)]
    pub report: Option<ReportSettings>,

    #[serde(default)]
    pub sources: Sources,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Target {
    /// Root directory below which all backups are stored.
    pub directory: PathBuf,
}

/// All configured tasks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Sources {
    #[serde(default)]
    pub directories: Vec<Directory>,
    #[serde(default)]
    pub databases: Vec<Database>,
    #[serde(default)]
    pub servers: Vec<Server>,
}

#[derive(Debug, Display, Error, From)]
pub enum ConfigurationError {
    #[display("The configuration file is missing")]
    Mount(MountError),
    #[display("Failed to read the configuration file {}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[display("The configuration is invalid")]
    #[from]
    Json(serde_json::Error),
    #[display("The configuration is invalid")]
    #[from]
    Toml(toml::de::Error),
    #[display("The timezone \"{_0}\" is invalid")]
    Timezone(#[error(ignore)] String),
    #[display("The target directory \"{}\" must be an absolute path", _0.display())]
    RelativeTarget(#[error(ignore)] PathBuf),
    #[display("The {} backup \"{name}\" is invalid: {reason}", kind.noun())]
    InvalidTask {
        kind: BackupType,
        name: String,
        reason: ValidationError,
    },
    #[display("The directory of the log file {} is missing", path.display())]
    LogDirectory { path: PathBuf, source: MountError },
    #[display("Failed to open the log file {}", path.display())]
    LogFile { path: PathBuf, source: io::Error },
}

impl Configuration {
    /// Reads, parses and validates the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = if path.extension().is_some_and(|ext| ext == "toml") {
            Self::from_toml(&content)?
        } else {
            Self::from_json(&content)?
        };
        config.validate()?;

        log::debug!(target: "app", "Configuration {} successfully loaded", path.display());
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigurationError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigurationError> {
        Ok(toml::from_str(content)?)
    }

    /// Checks values serde can't check.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.target.directory.is_relative() {
            return Err(ConfigurationError::RelativeTarget(
                self.target.directory.clone(),
            ));
        }

        if let Some(timezone) = &self.timezone {
            if !is_known_timezone(timezone) {
                return Err(ConfigurationError::Timezone(timezone.clone()));
            }
        }

        validate_tasks(&self.sources.directories)?;
        validate_tasks(&self.sources.databases)?;
        validate_tasks(&self.sources.servers)?;

        Ok(())
    }

    /// Exports the configured timezone for this process and all child processes.
    pub fn apply_timezone(&self) {
        if let Some(timezone) = &self.timezone {
            std::env::set_var("TZ", timezone);
            log::debug!(target: "app", "Timezone {timezone} successfully set");
        }
    }
}

/// Opens the log file at `path` for appending, its directory must exist.
pub fn open_log_file(path: &Path) -> Result<File, ConfigurationError> {
    let directory = path.parent().filter(|parent| !parent.as_os_str().is_empty());
    if let Some(directory) = directory {
        tool::mount_directory(directory).map_err(|source| ConfigurationError::LogDirectory {
            path: path.to_path_buf(),
            source,
        })?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| ConfigurationError::LogFile {
            path: path.to_path_buf(),
            source,
        })
}

fn validate_tasks<T: Backup>(tasks: &[T]) -> Result<(), ConfigurationError> {
    for task in tasks {
        task.validate()
            .map_err(|reason| ConfigurationError::InvalidTask {
                kind: T::TYPE,
                name: task.name().to_string(),
                reason,
            })?;
    }
    Ok(())
}

fn is_known_timezone(timezone: &str) -> bool {
    if timezone == "UTC" {
        return true;
    }

    let relative = Path::new(timezone);
    let plain = !timezone.is_empty()
        && relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    plain && Path::new(ZONEINFO).join(relative).is_file()
}

/// Deserializes a flag which is either a boolean or the string `"yes"`.
pub(crate) fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(enabled)) => enabled,
        Some(Flag::Text(text)) => text.eq_ignore_ascii_case("yes"),
        None => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::database::DatabaseSource;

    const AGENT: &str = r#"{
        "mode": "agent",
        "timezone": "UTC",
        "language": "en_US",
        "debug": "yes",
        "target": {"directory": "/var/backups"},
        "report": {
            "sender": {"address": "backup@example.org"},
            "subject": "Backup",
            "recipients": [{"address": "admin@example.org"}],
            "disabled": "no"
        },
        "sources": {
            "directories": [
                {"name": "My Photos", "source": "/data/photos", "target": "/d1"}
            ],
            "databases": [
                {
                    "name": "app",
                    "source": {
                        "type": "docker",
                        "container": "app-db",
                        "user": "MYSQL_USER",
                        "password": "MYSQL_PASSWORD"
                    },
                    "disabled": true
                }
            ]
        }
    }"#;

    #[test]
    fn parses_agent_configuration() {
        let config = Configuration::from_json(AGENT).unwrap();
        config.validate().unwrap();

        assert_eq!(config.mode, Mode::Agent);
        assert!(config.debug);
        assert_eq!(config.target.directory, PathBuf::from("/var/backups"));
        assert!(!config.report.as_ref().unwrap().disabled);
        assert_eq!(config.sources.directories[0].target, "/d1");
        assert!(config.sources.databases[0].disabled);
        assert!(matches!(
            config.sources.databases[0].source,
            DatabaseSource::Docker { .. }
        ));
        assert!(config.sources.servers.is_empty());
    }

    #[test]
    fn parses_toml() {
        let config = Configuration::from_toml(
            r#"
            mode = "manager"

            [target]
            directory = "/var/backups"

            [[sources.servers]]
            name = "web"
            host = "web.example.org"
            source = "/backup"
            ssh = { key = "/root/.ssh/id_rsa", port = 2222 }
            "#,
        )
        .unwrap();

        assert_eq!(config.mode, Mode::Manager);
        assert!(!config.debug);
        assert!(config.report.is_none());
        assert_eq!(config.sources.servers[0].ssh.port, 2222);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let json = r#"{"mode": "client", "target": {"directory": "/b"}}"#;
        let err = Configuration::from_json(json).unwrap_err();
        assert!(matches!(err, ConfigurationError::Json(_)));
    }

    #[test]
    fn relative_target_is_rejected() {
        let json = r#"{"mode": "agent", "target": {"directory": "backups"}}"#;
        let config = Configuration::from_json(json).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::RelativeTarget(_))
        ));
    }

    #[test]
    fn invalid_timezone_is_rejected() {
        let json = r#"{"mode": "agent", "target": {"directory": "/b"}}"#;
        let mut config = Configuration::from_json(json).unwrap();

        config.timezone = Some("Mars/Olympus_Mons".to_string());
        assert!(matches!(config.validate(), Err(ConfigurationError::Timezone(_))));

        config.timezone = Some("../../etc/passwd".to_string());
        assert!(matches!(config.validate(), Err(ConfigurationError::Timezone(_))));
    }

    #[test]
    fn invalid_task_is_rejected() {
        let config = Configuration::from_json(
            r#"{"mode": "agent", "target": {"directory": "/b"},
                "sources": {"directories": [{"name": "rel", "source": "data"}]}}"#,
        )
        .unwrap();

        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "The directory backup \"rel\" is invalid: source \"data\" must be an absolute path"
        );
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Configuration::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ConfigurationError::Read { .. }));
    }

    #[test]
    fn load_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.toml");
        fs::write(&path, "mode = \"agent\"\n[target]\ndirectory = \"/var/backups\"\n").unwrap();

        let config = Configuration::load(&path).unwrap();
        assert_eq!(config.mode, Mode::Agent);
    }

    #[test]
    fn log_file_is_created_and_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.log");
        fs::write(&path, "first\n").unwrap();

        let mut file = open_log_file(&path).unwrap();
        io::Write::write_all(&mut file, b"second\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn missing_log_directory_is_not_a_missing_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing/backup.log");

        let err = open_log_file(&path).unwrap_err();

        assert!(matches!(err, ConfigurationError::LogDirectory { .. }));
        assert!(err.to_string().starts_with("The directory of the log file"));
    }
}
