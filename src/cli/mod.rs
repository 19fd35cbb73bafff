use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (JSON, or TOML with a `.toml` extension).
    pub config: PathBuf,

    /// Verbosity of the command output.
    #[arg(long)]
    pub verbose: Option<LevelFilter>,

    /// Simulative backup run. Commands are logged but not executed.
    #[arg(long, env = "BACKUP_DRY_RUN")]
    pub dry_run: bool,

    /// Write the log into this file instead of stderr.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Working directory for temporary database dumps.
    #[arg(long, default_value_os_t = std::env::temp_dir())]
    pub work_dir: PathBuf,

    /// Mail transport used to send the report.
    #[arg(long, default_value = "sendmail")]
    pub sendmail: PathBuf,
}
