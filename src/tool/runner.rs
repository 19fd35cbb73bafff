use std::io::{self, BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;

/// Result of one finished shell invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Execution {
    /// Exit code of the shell, [None] if it was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Captured standard output, one entry per line.
    pub stdout: Vec<String>,
}

impl Execution {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs a rendered command line.
///
/// The production implementation is [Shell]. Anything else only exists to
/// exercise the orchestration without the external tools installed.
pub trait Runner {
    fn run(&self, script: &str) -> io::Result<Execution>;
}

/// Runs commands through `sh -c` inside a working directory.
#[derive(Debug, Clone)]
pub struct Shell {
    work_dir: PathBuf,
}

impl Shell {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }
}

impl Default for Shell {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

impl Runner for Shell {
    fn run(&self, script: &str) -> io::Result<Execution> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(script)
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // stderr is relayed on its own thread so a chatty tool can't block on a full pipe
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("stderr of child process not captured"))?;
        let stderr_relay = thread::spawn(move || {
            for line in lossy_lines(stderr) {
                log::debug!(target: "shell", "{line}");
            }
        });

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("stdout of child process not captured"))?;
        let mut lines = Vec::new();
        for line in lossy_lines(stdout) {
            log::debug!(target: "shell", "{line}");
            lines.push(line);
        }

        let status = child.wait()?;
        if stderr_relay.join().is_err() {
            log::warn!(target: "app", "Relaying stderr of the command panicked");
        }

        Ok(Execution {
            exit_code: status.code(),
            stdout: lines,
        })
    }
}

fn lossy_lines(pipe: impl Read) -> impl Iterator<Item = String> {
    BufReader::new(pipe)
        .split(b'\n')
        .map_while(Result::ok)
        .map(|line| {
            let line = String::from_utf8_lossy(&line);
            line.trim_end_matches('\r').to_string()
        })
}
