//! Check-mode command filtering.
//!
//! In check mode nothing that can change device state may be sent. Commands
//! that do not start with a read-only prefix are dropped and reported as
//! warnings instead of failing the run.

use crate::config::DEFAULT_READ_ONLY_PREFIXES;
use netrecon_proto::Command;
use tracing::debug;

/// Commands that survived filtering plus one warning per dropped command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilteredCommands {
    pub commands: Vec<Command>,
    pub warnings: Vec<String>,
}

/// Keeps commands whose text starts with one of `prefixes` (case-sensitive).
pub fn filter_read_only(commands: Vec<Command>, prefixes: &[String]) -> FilteredCommands {
    let allowed = if is_default_prefixes(prefixes) {
        "show commands".to_string()
    } else {
        format!("commands starting with {}", prefixes.join(", "))
    };

    let mut filtered = FilteredCommands::default();
    for command in commands {
        if prefixes.iter().any(|prefix| command.text().starts_with(prefix.as_str())) {
            filtered.commands.push(command);
        } else {
            debug!(command = %command, "Dropping non read-only command in check mode");
            filtered.warnings.push(format!(
                "Only {allowed} are supported when using check mode, not executing {command}"
            ));
        }
    }
    filtered
}

fn is_default_prefixes(prefixes: &[String]) -> bool {
    prefixes.len() == DEFAULT_READ_ONLY_PREFIXES.len()
        && prefixes
            .iter()
            .zip(DEFAULT_READ_ONLY_PREFIXES)
            .all(|(a, b)| a.as_str() == *b)
}
