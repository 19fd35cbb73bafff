use super::Server;
use crate::util::{escape, ShellCommand};

/// Builds the `rsync` over `ssh` command pulling the backups of `server`
/// into `local_target`.
///
/// Source and target get a trailing `/` so `rsync` copies the contents of
/// the directories.
///
/// - `-r`: recursive
/// - `-t`: preserve modification times
/// - `-e`: remote shell, `ssh` quiet without host key check on `port` using `key`
pub fn download_command(server: &Server, local_target: &str) -> ShellCommand {
    let ssh = &server.ssh;
    let remote_source = format!("{}/", server.source.trim_end_matches('/'));
    let local_target = format!("{}/", local_target.trim_end_matches('/'));

    ShellCommand::new("rsync")
        .literal("-r")
        .literal("-t")
        .literal("-e")
        .literal(format!(
            "\"ssh -t -q -o StrictHostKeyChecking=no -p {} -i {}\"",
            ssh.port,
            escape(&ssh.key.to_string_lossy())
        ))
        .literal(format!(
            "{}@{}:{}",
            ssh.user,
            server.host,
            escape(&remote_source)
        ))
        .arg(local_target)
}
