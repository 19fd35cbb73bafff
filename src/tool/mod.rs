//! The command executor: the only place where external processes are started.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use derive_more::{Display, Error};

use crate::util::ShellCommand;

#[cfg(test)]
pub(crate) mod fake;
mod runner;

#[cfg(test)]
pub(crate) use fake::FakeRunner;
pub use runner::{Execution, Runner, Shell};

/// An external command could not be run or did not succeed.
#[derive(Debug, Display, Error)]
pub enum ToolError {
    /// The command exited with a non-zero status.
    #[display("Failed to execute command: {command} ({})", describe_exit(exit_code))]
    Failed {
        command: String,
        exit_code: Option<i32>,
    },
    /// The shell itself could not be started.
    #[display("Failed to start command: {command}")]
    Spawn { command: String, source: io::Error },
    /// The command succeeded but the expected path is missing afterwards.
    #[display("Command did not create {}: {command}", path.display())]
    NotCreated { command: String, path: PathBuf },
}

impl ToolError {
    /// Exit code of the failed command, if it ran to completion.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Failed { exit_code, .. } => *exit_code,
            Self::NotCreated { .. } => Some(0),
            Self::Spawn { .. } => None,
        }
    }
}

fn describe_exit(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// A path could not be made available to the backup run.
#[derive(Debug, Display, Error)]
pub enum MountError {
    #[display("Failed to mount {}", path.display())]
    Missing { path: PathBuf, source: io::Error },
    #[display("Failed to mount {}: not a directory", path.display())]
    NotADirectory { path: PathBuf },
}

/// Makes the directory `path` available under its own path.
pub fn mount_directory(path: &Path) -> Result<PathBuf, MountError> {
    let mounted = mount(path, path)?;
    if !mounted.is_dir() {
        return Err(MountError::NotADirectory {
            path: path.to_path_buf(),
        });
    }

    Ok(mounted)
}

/// Makes the external path available as `internal`.
///
/// Programs see the real file system, so mounting verifies that the external
/// path is reachable and returns its canonical form.
pub fn mount(internal: &Path, external: &Path) -> Result<PathBuf, MountError> {
    let mounted = fs::canonicalize(external).map_err(|source| MountError::Missing {
        path: external.to_path_buf(),
        source,
    })?;

    log::debug!(target: "app", "Path \"{}\" successfully mounted as \"{}\"", mounted.display(), internal.display());
    Ok(mounted)
}

/// Working state of one archive creation: what to pack and where to put it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveJob {
    /// File or directory to pack. Relative paths are resolved in the working directory.
    pub source: PathBuf,
    /// Target directory, relative to the target root.
    pub target: String,
    /// File name of the archive including its extension.
    pub archive: String,
}

/// Executes commands and owns directory and archive creation.
#[derive(Debug)]
pub struct Tool<R = Shell> {
    target_root: String,
    runner: R,
    dry_run: bool,
    started: Option<Instant>,
}

impl<R: Runner> Tool<R> {
    /// Create a new [Tool] writing below `target_root`.
    pub fn new(target_root: &str, runner: R) -> Self {
        Self {
            target_root: target_root.trim_end_matches('/').to_string(),
            runner,
            dry_run: false,
            started: None,
        }
    }

    /// Log commands instead of executing them.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Resolves a target relative path against the target root.
    pub fn resolve(&self, path: &str) -> PathBuf {
        if path.is_empty() || path.starts_with('/') {
            PathBuf::from(format!("{}{path}", self.target_root))
        } else {
            PathBuf::from(format!("{}/{path}", self.target_root))
        }
    }

    /// Creates `path` below the target root, unless it exists already.
    pub fn create_directory(&self, path: &str) -> Result<PathBuf, ToolError> {
        let absolute = self.resolve(path);
        if absolute.is_dir() {
            log::debug!(target: "app", "Directory \"{}\" already exists", absolute.display());
            return Ok(absolute);
        }

        let command = ShellCommand::new("mkdir")
            .literal("-p")
            .arg(absolute.to_string_lossy());
        self.execute(&command)?;

        if !self.dry_run && !absolute.is_dir() {
            return Err(ToolError::NotCreated {
                command: command.to_string(),
                path: absolute,
            });
        }

        log::debug!(target: "app", "Directory \"{}\" successfully created", absolute.display());
        Ok(absolute)
    }

    /// Packs the source of `job` into a bzip2 compressed tarball.
    ///
    /// A partially written archive is removed on failure.
    pub fn create_archive(&self, job: &ArchiveJob) -> Result<PathBuf, ToolError> {
        let target = format!("{}/{}", job.target.trim_end_matches('/'), job.archive);
        let archive_path = self.resolve(&target);

        let command = ShellCommand::new("tar")
            .literal("-cjf")
            .arg(archive_path.to_string_lossy())
            .arg(job.source.to_string_lossy());

        if let Err(e) = self.execute(&command) {
            if archive_path.exists() {
                match fs::remove_file(&archive_path) {
                    Ok(()) => {
                        log::debug!(target: "app", "Removed incomplete archive \"{}\"", archive_path.display())
                    }
                    Err(remove_err) => {
                        log::warn!(target: "app", "Failed to remove incomplete archive \"{}\": {remove_err}", archive_path.display())
                    }
                }
            }
            return Err(e);
        }

        log::debug!(target: "app", "Archive \"{target}\" successfully created");
        Ok(archive_path)
    }

    /// Runs `command` through the shell and returns its output lines.
    pub fn execute(&self, command: &ShellCommand) -> Result<Vec<String>, ToolError> {
        if self.dry_run {
            log::info!(target: "app", "Dry run, skipping command: {command}");
            return Ok(Vec::new());
        }

        log::debug!(target: "app", "Execute command: {command}");
        let execution = self
            .runner
            .run(&command.script())
            .map_err(|source| ToolError::Spawn {
                command: command.to_string(),
                source,
            })?;
        log::debug!(target: "app", "Return status: {}", describe_exit(&execution.exit_code));

        if !execution.success() {
            return Err(ToolError::Failed {
                command: command.to_string(),
                exit_code: execution.exit_code,
            });
        }

        Ok(execution.stdout)
    }

    /// Size of a created file, [None] if it is missing.
    pub fn file_size(&self, path: &Path) -> Option<u64> {
        fs::metadata(path).ok().map(|metadata| metadata.len())
    }

    /// Removes a temporary file from the working directory.
    pub fn remove_file(&self, path: &Path) -> Result<(), ToolError> {
        let command = ShellCommand::new("rm")
            .literal("-f")
            .arg(path.to_string_lossy());
        self.execute(&command).map(|_| ())
    }

    /// Starts the timer for the next task.
    pub fn set_duration_start(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Time passed since [`set_duration_start`](Self::set_duration_start).
    pub fn duration(&self) -> Duration {
        self.started
            .map(|started| started.elapsed())
            .unwrap_or_default()
    }
}
