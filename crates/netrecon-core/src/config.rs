//! Request types for the reconcile and command controllers.
//!
//! Requests are plain serde structs. They can be built in code or loaded from
//! YAML, and every request is validated in a single pass before a controller
//! touches the device.
//!
//! ```yaml
//! lines:
//!   - ip address 192.0.2.1 255.255.255.0
//! parents:
//!   - interface GigabitEthernet0/1
//! match: strict
//! save_when: modified
//! diff_ignore_lines:
//!   - "^ntp clock-period"
//! ```

use netrecon_proto::{Command, MatchMode, ReplaceMode};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Retries performed by a command request when none are configured.
pub const DEFAULT_RETRIES: u32 = 9;

/// Seconds between retries when no interval is configured.
pub const DEFAULT_INTERVAL_SECS: f64 = 1.0;

/// Delimiter used when pushing banner blocks.
pub const DEFAULT_MULTILINE_DELIMITER: &str = "@";

/// Command prefixes allowed through in check mode.
pub const DEFAULT_READ_ONLY_PREFIXES: &[&str] = &["show"];

/// Command the device runs to persist its running configuration.
pub const SAVE_COMMAND: &str = "copy running-config startup-config";

fn default_multiline_delimiter() -> String {
    DEFAULT_MULTILINE_DELIMITER.to_string()
}

fn default_retries() -> u32 {
    DEFAULT_RETRIES
}

fn default_interval() -> f64 {
    DEFAULT_INTERVAL_SECS
}

fn default_read_only_prefixes() -> Vec<String> {
    DEFAULT_READ_ONLY_PREFIXES
        .iter()
        .map(|prefix| (*prefix).to_string())
        .collect()
}

/// When the running configuration is copied to startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveWhen {
    /// Persist on every run.
    Always,
    /// Never persist.
    #[default]
    Never,
    /// Persist when running and startup configurations differ.
    Modified,
    /// Persist when this run pushed changes.
    Changed,
}

impl fmt::Display for SaveWhen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => write!(f, "always"),
            Self::Never => write!(f, "never"),
            Self::Modified => write!(f, "modified"),
            Self::Changed => write!(f, "changed"),
        }
    }
}

/// Baseline the reported diff is computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffAgainst {
    Running,
    Startup,
    Intended,
}

impl fmt::Display for DiffAgainst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Startup => write!(f, "startup"),
            Self::Intended => write!(f, "intended"),
        }
    }
}

/// Whether all or any wait-for conditions must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    #[default]
    All,
    Any,
}

impl fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Any => write!(f, "any"),
        }
    }
}

/// Where the candidate configuration comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    /// `lines` nested under `parents`.
    InlineLines,
    /// `src` text used verbatim.
    SrcText,
}

/// Where a backup would be written. Carried through for the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupOptions {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub dir_path: Option<PathBuf>,
}

/// Bounded retry settings for the conditional retry executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional sends after the first one.
    pub retries: u32,
    /// Pause between sends.
    pub interval: Duration,
    pub match_policy: MatchPolicy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            interval: Duration::from_secs_f64(DEFAULT_INTERVAL_SECS),
            match_policy: MatchPolicy::All,
        }
    }
}

impl RetryPolicy {
    pub fn new(retries: u32, interval: Duration, match_policy: MatchPolicy) -> Self {
        Self {
            retries,
            interval,
            match_policy,
        }
    }
}

/// A request to reconcile a device's running configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileRequest {
    /// Candidate configuration text, used verbatim.
    #[serde(default)]
    pub src: Option<String>,

    /// Candidate lines, nested under `parents`.
    #[serde(default, alias = "commands")]
    pub lines: Vec<String>,

    /// Parent path for `lines`, outermost first.
    #[serde(default)]
    pub parents: Vec<String>,

    /// Commands pushed ahead of the diff when there is one.
    #[serde(default)]
    pub before: Vec<String>,

    /// Commands pushed after the diff when there is one.
    #[serde(default)]
    pub after: Vec<String>,

    #[serde(default, rename = "match")]
    pub match_mode: MatchMode,

    #[serde(default, rename = "replace")]
    pub replace_mode: ReplaceMode,

    /// Single character bounding banner blocks.
    #[serde(default = "default_multiline_delimiter")]
    pub multiline_delimiter: String,

    /// Running configuration supplied by the caller instead of fetching it.
    #[serde(default, alias = "config", rename = "running_config")]
    pub running_config_override: Option<String>,

    /// Desired configuration for `diff_against: intended`.
    #[serde(default)]
    pub intended_config: Option<String>,

    /// Fetch the running configuration including default values.
    #[serde(default)]
    pub defaults: bool,

    /// Return the pre-change running configuration as a backup.
    #[serde(default)]
    pub backup: bool,

    #[serde(default)]
    pub backup_options: Option<BackupOptions>,

    #[serde(default)]
    pub save_when: SaveWhen,

    #[serde(default)]
    pub diff_against: Option<DiffAgainst>,

    /// Regular expressions for lines excluded from diffs and hashes.
    #[serde(default)]
    pub diff_ignore_lines: Vec<String>,

    /// Dry run: compute everything, mutate nothing.
    #[serde(default)]
    pub check_mode: bool,

    /// Whether the caller wants a before/after diff in the outcome.
    #[serde(default, rename = "diff")]
    pub diff_requested: bool,
}

impl Default for ReconcileRequest {
    fn default() -> Self {
        Self {
            src: None,
            lines: Vec::new(),
            parents: Vec::new(),
            before: Vec::new(),
            after: Vec::new(),
            match_mode: MatchMode::default(),
            replace_mode: ReplaceMode::default(),
            multiline_delimiter: default_multiline_delimiter(),
            running_config_override: None,
            intended_config: None,
            defaults: false,
            backup: false,
            backup_options: None,
            save_when: SaveWhen::default(),
            diff_against: None,
            diff_ignore_lines: Vec::new(),
            check_mode: false,
            diff_requested: false,
        }
    }
}

impl ReconcileRequest {
    /// Loads a request from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        debug!(path = %path_ref.display(), "Loading reconcile request from file");
        let content = std::fs::read_to_string(path_ref)?;
        Self::parse_yaml(&content)
    }

    /// Parses a request from a YAML string.
    pub fn parse_yaml(content: &str) -> Result<Self, ConfigError> {
        let request: Self = serde_yaml::from_str(content)?;
        debug!(
            candidate = ?request.candidate_source(),
            match_mode = %request.match_mode,
            save_when = %request.save_when,
            "Reconcile request loaded"
        );
        Ok(request)
    }

    /// Where the candidate comes from, if one was supplied.
    ///
    /// An empty `src` counts as no candidate.
    pub fn candidate_source(&self) -> Option<CandidateSource> {
        if self.has_src() {
            Some(CandidateSource::SrcText)
        } else if !self.lines.is_empty() {
            Some(CandidateSource::InlineLines)
        } else {
            None
        }
    }

    fn has_src(&self) -> bool {
        self.src.as_deref().is_some_and(|src| !src.is_empty())
    }

    /// The banner delimiter. Only meaningful after [`validate`](Self::validate).
    pub fn delimiter(&self) -> char {
        self.multiline_delimiter.chars().next().unwrap_or('@')
    }

    /// Validates the request and returns warnings.
    ///
    /// This method checks for:
    /// - A multi-character or empty `multiline_delimiter`
    /// - Mutual exclusivity of `lines`/`src` and `parents`/`src`
    /// - Options that require `lines`, `src` or `intended_config`
    /// - `diff_ignore_lines` entries that are not valid regular expressions
    pub fn validate(&self) -> Result<Vec<String>, ValidationError> {
        let mut warnings = Vec::new();

        if self.multiline_delimiter.chars().count() != 1 {
            return Err(ValidationError::InvalidMultilineDelimiter(
                self.multiline_delimiter.clone(),
            ));
        }

        if self.has_src() && !self.lines.is_empty() {
            return Err(ValidationError::MutuallyExclusive {
                field1: "lines".to_string(),
                field2: "src".to_string(),
            });
        }

        if self.has_src() && !self.parents.is_empty() {
            return Err(ValidationError::MutuallyExclusive {
                field1: "parents".to_string(),
                field2: "src".to_string(),
            });
        }

        let has_lines = !self.lines.is_empty();
        match self.match_mode {
            MatchMode::Strict if !has_lines => {
                return Err(ValidationError::missing("match", "strict", "lines"));
            }
            MatchMode::Exact if !has_lines && !self.has_src() => {
                return Err(ValidationError::missing("match", "exact", "lines or src"));
            }
            _ => {}
        }

        if self.replace_mode == ReplaceMode::Block && !has_lines {
            return Err(ValidationError::missing("replace", "block", "lines"));
        }

        if self.diff_against == Some(DiffAgainst::Intended) && self.intended_config.is_none() {
            return Err(ValidationError::missing(
                "diff_against",
                "intended",
                "intended_config",
            ));
        }

        for pattern in &self.diff_ignore_lines {
            if let Err(e) = Regex::new(pattern) {
                return Err(ValidationError::InvalidIgnorePattern {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                });
            }
        }

        if self.diff_against.is_some() && !self.diff_requested {
            warnings.push("diff_against has no effect unless diff output is requested".to_string());
        }

        if self.backup_options.is_some() && !self.backup {
            warnings.push("backup_options is ignored unless backup is enabled".to_string());
        }

        Ok(warnings)
    }
}

/// A request to run commands until wait-for conditions hold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRequest {
    pub commands: Vec<Command>,

    /// Raw conditional expressions evaluated against the responses.
    #[serde(default, alias = "waitfor")]
    pub wait_for: Vec<String>,

    #[serde(default, rename = "match")]
    pub match_policy: MatchPolicy,

    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Seconds between retries.
    #[serde(default = "default_interval")]
    pub interval: f64,

    #[serde(default)]
    pub check_mode: bool,

    /// Prefixes of commands allowed through in check mode.
    #[serde(default = "default_read_only_prefixes")]
    pub read_only_prefixes: Vec<String>,
}

impl CommandRequest {
    /// Creates a request with default retry settings.
    pub fn new(commands: impl IntoIterator<Item = impl Into<Command>>) -> Self {
        Self {
            commands: commands.into_iter().map(Into::into).collect(),
            wait_for: Vec::new(),
            match_policy: MatchPolicy::All,
            retries: DEFAULT_RETRIES,
            interval: DEFAULT_INTERVAL_SECS,
            check_mode: false,
            read_only_prefixes: default_read_only_prefixes(),
        }
    }

    /// Loads a request from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        debug!(path = %path_ref.display(), "Loading command request from file");
        let content = std::fs::read_to_string(path_ref)?;
        Self::parse_yaml(&content)
    }

    /// Parses a request from a YAML string.
    pub fn parse_yaml(content: &str) -> Result<Self, ConfigError> {
        let request: Self = serde_yaml::from_str(content)?;
        debug!(
            commands = request.commands.len(),
            conditions = request.wait_for.len(),
            retries = request.retries,
            "Command request loaded"
        );
        Ok(request)
    }

    /// Validates the request and returns warnings.
    pub fn validate(&self) -> Result<Vec<String>, ValidationError> {
        let mut warnings = Vec::new();

        if self.commands.is_empty() {
            return Err(ValidationError::NoCommands);
        }

        self.retry_policy()?;

        if self.read_only_prefixes.iter().any(String::is_empty) {
            return Err(ValidationError::EmptyReadOnlyPrefix);
        }

        if self.wait_for.is_empty() && self.match_policy == MatchPolicy::Any {
            warnings.push("match has no effect without wait_for conditions".to_string());
        }

        Ok(warnings)
    }

    /// The retry policy described by this request.
    pub fn retry_policy(&self) -> Result<RetryPolicy, ValidationError> {
        let interval = Duration::try_from_secs_f64(self.interval)
            .map_err(|_| ValidationError::InvalidInterval(self.interval))?;
        Ok(RetryPolicy::new(self.retries, interval, self.match_policy))
    }
}

/// A request that cannot be run as given.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("multiline_delimiter value can only be a single character, got '{0}'")]
    InvalidMultilineDelimiter(String),

    #[error("Mutually exclusive fields: '{field1}' and '{field2}' cannot both be specified")]
    MutuallyExclusive { field1: String, field2: String },

    #[error("{field} is {value} but {required} is missing")]
    MissingRequired {
        field: String,
        value: String,
        required: String,
    },

    #[error("Invalid diff_ignore_lines pattern '{pattern}': {message}")]
    InvalidIgnorePattern { pattern: String, message: String },

    #[error("interval must be a finite, non-negative number of seconds, got {0}")]
    InvalidInterval(f64),

    #[error("at least one command is required")]
    NoCommands,

    #[error("read_only_prefixes must not contain empty prefixes")]
    EmptyReadOnlyPrefix,
}

impl ValidationError {
    fn missing(field: &str, value: &str, required: &str) -> Self {
        Self::MissingRequired {
            field: field.to_string(),
            value: value.to_string(),
            required: required.to_string(),
        }
    }
}

/// Errors loading a request file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
