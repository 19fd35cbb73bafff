use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use super::ReportError;

/// A rendered mail ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Mail {
    /// Value of the first header called `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The mail in internet message format.
    pub fn to_message(&self) -> String {
        let mut message = String::new();
        for (key, value) in &self.headers {
            message.push_str(key);
            message.push_str(": ");
            message.push_str(value);
            message.push_str("\r\n");
        }
        message.push_str("\r\n");
        message.push_str(&self.body);
        message
    }
}

/// Delivers a rendered [Mail].
pub trait Mailer {
    fn deliver(&self, mail: &Mail) -> Result<(), ReportError>;
}

/// Hands mails to the local MTA via `sendmail -t -i`.
///
/// Recipients are taken from the `To`, `Cc` and `Bcc` headers.
#[derive(Debug, Clone)]
pub struct Sendmail {
    program: PathBuf,
}

impl Sendmail {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Mailer for Sendmail {
    fn deliver(&self, mail: &Mail) -> Result<(), ReportError> {
        log::debug!(target: "report", "Deliver report using {}", self.program.display());

        let mut process = Command::new(&self.program)
            .arg("-t")
            .arg("-i")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ReportError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        {
            let mut stdin = process.stdin.take().ok_or_else(|| {
                ReportError::Write(std::io::Error::other("stdin of mail transport not captured"))
            })?;
            stdin
                .write_all(mail.to_message().as_bytes())
                .map_err(ReportError::Write)?;
        }

        let mut stderr = String::new();
        if let Some(mut pipe) = process.stderr.take() {
            let _ = pipe.read_to_string(&mut stderr);
        }
        let status = process.wait().map_err(ReportError::Write)?;

        // relay stderr
        if !stderr.trim().is_empty() {
            log::warn!(target: "report", "{}", stderr.trim_end());
        }

        if !status.success() {
            return Err(ReportError::Failed {
                program: self.program.clone(),
                exit_code: status.code(),
            });
        }

        Ok(())
    }
}
