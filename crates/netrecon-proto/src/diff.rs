//! Config diff contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How candidate lines are matched against the running configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Match line by line, ignoring position.
    #[default]
    Line,
    /// Match line by line, including position within the parent.
    Strict,
    /// The candidate block must equal the running block exactly.
    Exact,
    /// Push the candidate without comparing.
    None,
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Line => write!(f, "line"),
            Self::Strict => write!(f, "strict"),
            Self::Exact => write!(f, "exact"),
            Self::None => write!(f, "none"),
        }
    }
}

/// How a changed section is replaced on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplaceMode {
    /// Push only the differing lines.
    #[default]
    Line,
    /// Push the whole block when any line differs.
    Block,
}

impl fmt::Display for ReplaceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Line => write!(f, "line"),
            Self::Block => write!(f, "block"),
        }
    }
}

/// Inputs to a diff computation.
#[derive(Debug, Clone, Copy)]
pub struct DiffRequest<'a> {
    /// Desired configuration text.
    pub candidate: &'a str,
    /// Current configuration text.
    pub running: &'a str,
    pub match_mode: MatchMode,
    pub replace_mode: ReplaceMode,
    /// Regular expressions for lines excluded from comparison.
    pub ignore_lines: &'a [String],
    /// Parent path the candidate lines live under.
    pub path: &'a [String],
}

/// Result of a diff computation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDiff {
    /// Line-oriented commands that move running towards candidate.
    pub line_commands: Vec<String>,
    /// Multi-line banner blocks, never line-diffed.
    pub banner_diff: Option<String>,
}

impl ConfigDiff {
    /// Returns true when neither the line diff nor the banner diff has content.
    pub fn is_empty(&self) -> bool {
        self.line_commands.is_empty() && self.banner_diff.as_deref().is_none_or(str::is_empty)
    }
}

/// Error raised by a diff collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("diff computation failed: {0}")]
pub struct DiffError(pub String);

/// Computes the commands that transform a running configuration into a candidate.
#[async_trait]
pub trait ConfigDiffer: Send + Sync {
    async fn build_config_diff(&self, request: DiffRequest<'_>) -> Result<ConfigDiff, DiffError>;
}
