//! Runs all configured tasks of a mode and reports their outcome.
//!
//! Tasks run strictly one after another. A failing task is logged and
//! reported, the remaining tasks run regardless.

use crate::backends::Backup;
use crate::config::{Mode, Sources};
use crate::report::{format_duration, Entry, Report, Status};
use crate::tool::{Runner, Tool};
use crate::util::error_chain;

/// What happened to the report at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// No report configured or reporting disabled.
    Disabled,
    /// Dry run, the report was composed but not sent.
    Skipped,
    Sent,
    Failed,
}

/// Result of a whole run.
#[derive(Debug)]
pub struct RunSummary {
    pub entries: Vec<Entry>,
    pub delivery: Delivery,
}

impl RunSummary {
    /// Number of tasks which failed.
    pub fn failures(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.status == Status::Error)
            .count()
    }
}

#[derive(Debug)]
pub struct Orchestrator<R> {
    tool: Tool<R>,
    report: Report,
}

impl<R: Runner> Orchestrator<R> {
    pub fn new(tool: Tool<R>, report: Report) -> Self {
        Self { tool, report }
    }

    /// Backups all sources handled by `mode` and sends the report.
    pub fn run(mut self, mode: Mode, sources: &Sources) -> RunSummary {
        match mode {
            Mode::Agent => {
                log::info!(target: "app", "Starting backup in agent mode");
                self.run_tasks(&sources.directories);
                self.run_tasks(&sources.databases);
            }
            Mode::Manager => {
                log::info!(target: "app", "Starting backup in manager mode");
                self.run_tasks(&sources.servers);
            }
        }

        let delivery = self.deliver();
        RunSummary {
            entries: self.report.into_entries(),
            delivery,
        }
    }

    fn run_tasks<T: Backup>(&mut self, tasks: &[T]) {
        let kind = T::TYPE;
        if tasks.is_empty() {
            log::warn!(target: "app", "No {} set in configuration.", kind.heading().to_lowercase());
            return;
        }

        for task in tasks {
            let name = task.name();
            if task.is_disabled() {
                let message = format!("Backup of {} \"{name}\" is disabled.", kind.noun());
                log::info!(target: "app", "{message}");
                self.report.add(Status::Info, kind, name, message, None, None);
                continue;
            }

            log::info!(target: "app", "Starting backup of {} \"{name}\"", kind.noun());
            self.tool.set_duration_start();
            match task.backup(&self.tool) {
                Ok(outcome) => {
                    let duration = self.tool.duration();
                    match outcome.status {
                        Status::Ok => {
                            log::info!(target: "app", "Backup of {} \"{name}\" finished after {}", kind.noun(), format_duration(duration))
                        }
                        _ => {
                            log::warn!(target: "app", "Backup of {} \"{name}\" finished with warnings: {}", kind.noun(), outcome.message)
                        }
                    }
                    self.report.add(
                        outcome.status,
                        kind,
                        name,
                        outcome.message,
                        outcome.file_size,
                        Some(duration),
                    );
                }
                Err(e) => {
                    let duration = self.tool.duration();
                    log::error!(target: "app", "{}", error_chain(&e));
                    self.report
                        .add(Status::Error, kind, name, e.to_string(), None, Some(duration));
                }
            }
        }
    }

    fn deliver(&self) -> Delivery {
        if !self.report.is_enabled() {
            log::debug!(target: "report", "Reporting is disabled");
            return Delivery::Disabled;
        }

        if self.tool.is_dry_run() {
            match self.report.compose() {
                Ok(mail) => {
                    log::info!(target: "report", "Dry run, skipping delivery of report \"{}\"", mail.header("Subject").unwrap_or_default())
                }
                Err(e) => log::warn!(target: "report", "Failed to compose report: {e}"),
            }
            return Delivery::Skipped;
        }

        match self.report.send() {
            Ok(()) => {
                log::info!(target: "report", "Report successfully sent");
                Delivery::Sent
            }
            Err(e) => {
                log::error!(target: "report", "Failed to send report: {}", error_chain(&e));
                Delivery::Failed
            }
        }
    }
}
