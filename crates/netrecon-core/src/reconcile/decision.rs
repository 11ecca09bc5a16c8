//! Save and diff-against decision tables.
//!
//! Pure functions: the controller fetches whatever texts a decision needs
//! and hands them in already normalized.

use super::outcome::ConfigDiffReport;
use crate::config::{DiffAgainst, SaveWhen};
use crate::config_text::ConfigText;

/// Normalized running and startup texts fetched for `save_when: modified`.
#[derive(Debug, Clone)]
pub struct PersistedState {
    pub running: ConfigText,
    pub startup: ConfigText,
}

/// Decides whether the running configuration is copied to startup.
///
/// `persisted` is only consulted for [`SaveWhen::Modified`]; without it that
/// row never saves.
pub fn save_required(save_when: SaveWhen, changed: bool, persisted: Option<&PersistedState>) -> bool {
    match save_when {
        SaveWhen::Always => true,
        SaveWhen::Never => false,
        SaveWhen::Modified => persisted.is_some_and(|state| !state.running.same_content(&state.startup)),
        SaveWhen::Changed => changed,
    }
}

/// Builds the reported diff, or `None` when both sides hash the same.
///
/// `running` is the device's current configuration and `baseline` the text
/// selected by `diff_against`.
pub fn diff_report(
    diff_against: DiffAgainst,
    running: &ConfigText,
    baseline: &ConfigText,
) -> Option<ConfigDiffReport> {
    if running.same_content(baseline) {
        return None;
    }

    let (before, after) = match diff_against {
        DiffAgainst::Intended => (running, baseline),
        DiffAgainst::Running | DiffAgainst::Startup => (baseline, running),
    };
    Some(ConfigDiffReport {
        before: before.text().to_string(),
        after: after.text().to_string(),
    })
}
