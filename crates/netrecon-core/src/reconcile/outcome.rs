use serde::Serialize;

/// Before/after texts reported for a config diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigDiffReport {
    pub before: String,
    pub after: String,
}

/// Result of a successful reconcile run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    /// True if the device was (or in check mode would have been) changed.
    pub changed: bool,
    /// Commands pushed, including `before` and `after` commands.
    pub commands: Vec<String>,
    /// Same as `commands`.
    pub updates: Vec<String>,
    /// Banner diff pushed alongside the commands.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banners: Option<String>,
    pub warnings: Vec<String>,
    /// Running configuration captured before any change, when backup was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_contents: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<ConfigDiffReport>,
}
