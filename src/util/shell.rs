//! Shell command construction.
//!
//! Every value that originates from the configuration or from another
//! program's output is added as an escaped argument. Only the fixed skeleton
//! of a command (program names, flags, redirections) is added literally.

use std::fmt;

const MASK: &str = "******";

/// Escapes a value as a single POSIX shell word.
///
/// The value is wrapped in single quotes and embedded single quotes are
/// written as `'\''`, so the shell never interprets any of its characters.
pub fn escape(arg: &str) -> String {
    let mut escaped = String::with_capacity(arg.len() + 2);
    escaped.push('\'');
    for c in arg.chars() {
        if c == '\'' {
            escaped.push_str("'\\''");
        } else {
            escaped.push(c);
        }
    }
    escaped.push('\'');
    escaped
}

/// A command line for `sh -c`, assembled from typed parts.
///
/// [`script`](Self::script) renders the command for execution,
/// while [`Display`](fmt::Display) renders it with secrets masked for logs
/// and error messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellCommand {
    parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Arg(String),
    Flag {
        flag: &'static str,
        value: String,
        secret: bool,
    },
    Nested(ShellCommand),
}

impl ShellCommand {
    /// Starts a command with a fixed program name.
    pub fn new(program: &'static str) -> Self {
        Self::default().literal(program)
    }

    /// A user supplied script which is executed as is.
    ///
    /// Only used for hooks which the configuration explicitly declares as
    /// shell code.
    pub fn raw(script: impl Into<String>) -> Self {
        Self::default().literal(script)
    }

    /// Appends a skeleton token without escaping.
    pub fn literal(mut self, token: impl Into<String>) -> Self {
        self.parts.push(Part::Literal(token.into()));
        self
    }

    /// Appends an escaped argument.
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.parts.push(Part::Arg(value.into()));
        self
    }

    /// Appends a flag glued to its escaped value, e.g. `-h'localhost'`.
    pub fn flag(mut self, flag: &'static str, value: impl Into<String>) -> Self {
        self.parts.push(Part::Flag {
            flag,
            value: value.into(),
            secret: false,
        });
        self
    }

    /// Like [`flag`](Self::flag), but the value is masked when displayed.
    pub fn secret_flag(mut self, flag: &'static str, value: impl Into<String>) -> Self {
        self.parts.push(Part::Flag {
            flag,
            value: value.into(),
            secret: true,
        });
        self
    }

    /// Appends another command as one escaped argument, e.g. for `sh -c`.
    pub fn nested(mut self, command: ShellCommand) -> Self {
        self.parts.push(Part::Nested(command));
        self
    }

    /// The command line handed to the shell.
    pub fn script(&self) -> String {
        self.render(false)
    }

    fn render(&self, masked: bool) -> String {
        self.parts
            .iter()
            .map(|part| match part {
                Part::Literal(token) => token.clone(),
                Part::Arg(value) => escape(value),
                Part::Flag { flag, secret, .. } if *secret && masked => {
                    format!("{flag}{}", escape(MASK))
                }
                Part::Flag { flag, value, .. } => format!("{flag}{}", escape(value)),
                Part::Nested(command) => escape(&command.render(masked)),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(true))
    }
}
