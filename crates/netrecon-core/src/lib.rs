//! # netrecon-core
//!
//! Decision engine for reconciling network device configuration.
//!
//! This crate provides:
//! - Request types for reconcile and command runs, loadable from YAML
//! - The reconcile controller: candidate diff, apply, save and diff reporting
//! - The conditional retry executor behind command runs
//! - Check-mode filtering of state-changing commands
//! - Config text normalization and content hashing
//!
//! Device I/O, diff computation and predicate parsing are reached through the
//! traits in `netrecon-proto`. The `testing` module carries scripted
//! implementations of all three.

mod command_filter;
mod command_runner;
mod config;
mod config_text;
pub mod reconcile;
pub mod retry;
pub mod testing;

pub use command_filter::{FilteredCommands, filter_read_only};
pub use command_runner::{CommandError, CommandOutcome, CommandRunner};
pub use config::{
    BackupOptions, CandidateSource, CommandRequest, ConfigError, DEFAULT_INTERVAL_SECS,
    DEFAULT_MULTILINE_DELIMITER, DEFAULT_READ_ONLY_PREFIXES, DEFAULT_RETRIES, DiffAgainst,
    MatchPolicy, ReconcileRequest, RetryPolicy, SAVE_COMMAND, SaveWhen, ValidationError,
};
pub use config_text::{ConfigText, IgnoreLines, render_candidate};
pub use reconcile::{ConfigDiffReport, ReconcileController, ReconcileError, ReconcileOutcome};
pub use retry::{RetryExecutor, RetryOutcome, RetryState};
