//! Implements backup of local directories using [Directory].

use std::fmt;
use std::path::PathBuf;

use derive_more::{Display, Error};

use super::{default_target, target, Backup, Outcome, ValidationError};
use crate::config::flag;
use crate::report::BackupType;
use crate::tool::{self, ArchiveJob, MountError, Runner, Tool, ToolError};
use crate::util::{sanitize, ShellCommand};

const ARCHIVE_EXTENSION: &str = ".tar.bz2";

/// A local directory which is packed into `<name>.tar.bz2`.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Directory {
    pub name: String,

    /// Directory to pack.
    pub source: PathBuf,

    /// Directory below the target root receiving the archive.
    #[serde(default = "default_target", deserialize_with = "target")]
    pub target: String,

    #[serde(default, deserialize_with = "flag")]
    pub disabled: bool,

    /// Shell scripts run around the archive creation.
    #[serde(default)]
    pub commands: Hooks,
}

/// Optional shell scripts, e.g. to stop a service while its data is packed.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Hooks {
    pub before: Option<String>,
    pub after: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    Before,
    After,
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Before => f.write_str("before"),
            Self::After => f.write_str("after"),
        }
    }
}

/// Errors on backup of a [Directory].
#[derive(Debug, Display, Error)]
pub enum DirectoryError {
    #[display("Failed to create target directory for directory backup \"{name}\".")]
    TargetDirectory { name: String, source: ToolError },
    #[display("Failed to mount source directory for directory backup \"{name}\".")]
    Mount { name: String, source: MountError },
    #[display("Failed to run the {stage} command of directory backup \"{name}\".")]
    Hook {
        name: String,
        stage: HookStage,
        source: ToolError,
    },
    #[display("Failed to create archive for directory backup \"{name}\".")]
    Archive { name: String, source: ToolError },
}

impl Directory {
    fn run_hook<R: Runner>(&self, tool: &Tool<R>, stage: HookStage) -> Result<(), DirectoryError> {
        let script = match stage {
            HookStage::Before => &self.commands.before,
            HookStage::After => &self.commands.after,
        };
        let Some(script) = script.as_deref().filter(|s| !s.trim().is_empty()) else {
            return Ok(());
        };

        log::debug!(target: "app", "Run {stage} command of directory backup \"{}\"", self.name);
        tool.execute(&ShellCommand::raw(script))
            .map_err(|source| DirectoryError::Hook {
                name: self.name.clone(),
                stage,
                source,
            })?;
        Ok(())
    }
}

impl Backup for Directory {
    type Error = DirectoryError;

    const TYPE: BackupType = BackupType::Directory;

    fn name(&self) -> &str {
        &self.name
    }

    fn is_disabled(&self) -> bool {
        self.disabled
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.source.is_relative() {
            return Err(ValidationError::RelativeSource(self.source.clone()));
        }
        Ok(())
    }

    fn backup<R: Runner>(&self, tool: &Tool<R>) -> Result<Outcome, Self::Error> {
        let name = &self.name;

        tool.create_directory(&self.target)
            .map_err(|source| DirectoryError::TargetDirectory {
                name: name.clone(),
                source,
            })?;

        tool::mount_directory(&self.source).map_err(|source| DirectoryError::Mount {
            name: name.clone(),
            source,
        })?;

        let job = ArchiveJob {
            source: self.source.clone(),
            target: self.target.clone(),
            archive: format!("{}{ARCHIVE_EXTENSION}", sanitize(name)),
        };

        self.run_hook(tool, HookStage::Before)?;

        let archive = tool
            .create_archive(&job)
            .map_err(|source| DirectoryError::Archive {
                name: name.clone(),
                source,
            })?;

        self.run_hook(tool, HookStage::After)?;

        log::info!(target: "app", "Archive of directory \"{name}\" successfully created.");
        Ok(Outcome::ok().with_file_size(tool.file_size(&archive)))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::tool::FakeRunner;

    fn directory(source: &std::path::Path) -> Directory {
        Directory {
            name: "My Photos".to_string(),
            source: source.to_path_buf(),
            target: "/d1".to_string(),
            disabled: false,
            commands: Hooks::default(),
        }
    }

    #[test]
    fn archives_into_sanitized_name() {
        let root = tempfile::tempdir().unwrap();
        let source = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("d1")).unwrap();
        let root_str = root.path().to_string_lossy().to_string();
        let tool = Tool::new(&root_str, FakeRunner::new());

        let outcome = directory(source.path()).backup(&tool).unwrap();

        assert_eq!(outcome.status, crate::report::Status::Ok);
        assert_eq!(
            tool.runner().scripts(),
            vec![format!(
                "tar -cjf '{root_str}/d1/My_Photos.tar.bz2' '{}'",
                source.path().display()
            )]
        );
    }

    #[test]
    fn hooks_wrap_the_archive() {
        let root = tempfile::tempdir().unwrap();
        let source = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("d1")).unwrap();
        let tool = Tool::new(&root.path().to_string_lossy(), FakeRunner::new());
        let mut dir = directory(source.path());
        dir.commands = Hooks {
            before: Some("systemctl stop app".to_string()),
            after: Some("systemctl start app".to_string()),
        };

        dir.backup(&tool).unwrap();

        let scripts = tool.runner().scripts();
        assert_eq!(scripts.len(), 3);
        assert_eq!(scripts[0], "systemctl stop app");
        assert!(scripts[1].starts_with("tar -cjf "));
        assert_eq!(scripts[2], "systemctl start app");
    }

    #[test]
    fn failed_before_hook_skips_archive() {
        let root = tempfile::tempdir().unwrap();
        let source = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("d1")).unwrap();
        let runner = FakeRunner::new().respond("stop", 1, &[]);
        let tool = Tool::new(&root.path().to_string_lossy(), runner);
        let mut dir = directory(source.path());
        dir.commands.before = Some("stop".to_string());

        let err = dir.backup(&tool).unwrap_err();

        assert!(matches!(
            err,
            DirectoryError::Hook {
                stage: HookStage::Before,
                ..
            }
        ));
        assert_eq!(tool.runner().scripts(), vec!["stop"]);
    }

    #[test]
    fn missing_source_fails_on_mount() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("d1")).unwrap();
        let tool = Tool::new(&root.path().to_string_lossy(), FakeRunner::new());
        let dir = directory(&root.path().join("missing"));

        let err = dir.backup(&tool).unwrap_err();

        assert!(matches!(err, DirectoryError::Mount { .. }));
        assert!(tool.runner().scripts().is_empty());
    }

    #[test]
    fn relative_source_is_rejected() {
        let dir = directory(std::path::Path::new("data/photos"));
        assert_eq!(
            dir.validate(),
            Err(ValidationError::RelativeSource(PathBuf::from("data/photos")))
        );
    }

    #[test]
    fn deserializes_with_defaults() {
        let dir: Directory =
            serde_json::from_str(r#"{"name": "etc", "source": "/etc", "disabled": "yes"}"#)
                .unwrap();

        assert_eq!(dir.target, "/");
        assert!(dir.disabled);
        assert!(dir.commands.before.is_none());
    }
}
