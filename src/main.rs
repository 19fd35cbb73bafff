use std::error::Error;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use env_logger::{Env, Target};
use log::LevelFilter;

use sysbackup_lib::cli::Cli;
use sysbackup_lib::config::{self, Configuration, ConfigurationError};
use sysbackup_lib::orchestrator::{Delivery, Orchestrator};
use sysbackup_lib::report::{Report, Sendmail};
use sysbackup_lib::tool::{self, Shell, Tool};
use sysbackup_lib::util::error_chain;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // the configuration decides about the log level, so it is read first
    let config = tool::mount(&cli.config, &cli.config)
        .map_err(ConfigurationError::Mount)
        .and_then(|path| Configuration::load(&path));

    let level = cli.verbose.or_else(|| {
        config
            .as_ref()
            .is_ok_and(|config| config.debug)
            .then_some(LevelFilter::Debug)
    });
    if let Err(e) = init_logger(level, cli.log_file.as_deref()) {
        return fatal(&e);
    }

    let config = match config {
        Ok(config) => config,
        Err(e) => return fatal(&e),
    };

    if cli.dry_run {
        log::warn!(target: "app", "Running in dry-run mode");
    }

    config.apply_timezone();

    let target_root = match tool::mount_directory(&config.target.directory) {
        Ok(target_root) => target_root,
        Err(e) => return fatal(&e),
    };
    log::info!(target: "app", "Storing backups below {}", target_root.display());

    let tool = Tool::new(&target_root.to_string_lossy(), Shell::new(&cli.work_dir))
        .with_dry_run(cli.dry_run);
    let report = Report::new(
        config.report.clone(),
        config.language.clone(),
        Box::new(Sendmail::new(&cli.sendmail)),
    );

    let summary = Orchestrator::new(tool, report).run(config.mode, &config.sources);

    let failures = summary.failures();
    if failures > 0 {
        log::warn!(target: "app", "Backup finished, {failures} of {} tasks failed", summary.entries.len());
    } else {
        log::info!(target: "app", "Backup finished");
    }
    if summary.delivery == Delivery::Failed {
        log::warn!(target: "app", "The report could not be delivered, check the log for the task results");
    }

    ExitCode::SUCCESS
}

fn init_logger(
    level: Option<LevelFilter>,
    log_file: Option<&Path>,
) -> Result<(), ConfigurationError> {
    let mut env_logger = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    if let Some(level) = level {
        env_logger.filter_level(level);
    }

    if let Some(path) = log_file {
        let file = config::open_log_file(path)?;
        env_logger.target(Target::Pipe(Box::new(file)));
    }

    env_logger.try_init().expect("env_logger should not fail");
    Ok(())
}

fn fatal(err: &dyn Error) -> ExitCode {
    if log::max_level() == LevelFilter::Off {
        eprintln!("{}", error_chain(err));
    } else {
        log::error!(target: "app", "{}", error_chain(err));
    }
    ExitCode::FAILURE
}
