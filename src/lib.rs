//! Library to backup local directories, MySQL databases and remote servers.
//!
//! A run is either an *agent* run, packing local directories and database
//! dumps into compressed archives below a target root, or a *manager* run,
//! downloading the backups of remote servers with [rsync][rsync].
//! The different backup modules are located in the [`backends`] module, the
//! loop running them in [`orchestrator`].
//!
//! [rsync]: https://rsync.samba.org/

#![forbid(unsafe_code)]

pub mod backends;
pub mod cli;
pub mod config;
pub mod orchestrator;
pub mod report;
pub mod tool;
pub mod util;
