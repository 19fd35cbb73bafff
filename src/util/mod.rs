//! Small string helpers shared by the backends.

use std::error::Error;

pub mod sanitize;
pub mod shell;

pub use sanitize::sanitize;
pub use shell::{escape, ShellCommand};

/// Renders an error followed by all of its causes.
pub fn error_chain(err: &dyn Error) -> String {
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}
