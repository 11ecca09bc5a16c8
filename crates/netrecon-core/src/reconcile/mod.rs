//! Reconciliation of a device's running configuration.
//!
//! One run walks these steps in order:
//! 1. Validate the request (no device contact on failure)
//! 2. Snapshot the running config when a backup or a running diff needs it
//! 3. Resolve candidate and running texts, diff them, push the result
//! 4. Decide whether to save running to startup
//! 5. Resolve the diff-against baseline and report a diff
//!
//! Transport and diff failures abort the run. Nothing in this module retries.

mod decision;
mod outcome;

pub use decision::{PersistedState, diff_report, save_required};
pub use outcome::{ConfigDiffReport, ReconcileOutcome};

use crate::config::{
    CandidateSource, DiffAgainst, ReconcileRequest, SAVE_COMMAND, SaveWhen, ValidationError,
};
use crate::config_text::{ConfigText, IgnoreLines, render_candidate};
use netrecon_proto::{ConfigDiffer, DeviceTransport, DiffError, DiffRequest, TransportError};
use tracing::{debug, info, warn};

/// Prefix of a macro definition. The negated `no macro name` form is not a match.
const MACRO_PREFIX: &str = "macro name";

const IDEMPOTENCY_HINT: &str = "To ensure idempotency and correct diff the input configuration lines should be similar to how they appear if present in the running configuration on device";

/// Errors that end a reconcile run.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("invalid reconcile request: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Diff(#[from] DiffError),
}

/// Running config captured before anything was pushed.
#[derive(Debug, Clone)]
struct RunningSnapshot {
    text: String,
    include_defaults: bool,
}

/// Reconciles one device against one request.
pub struct ReconcileController<'a, D: ?Sized, F: ?Sized> {
    device: &'a mut D,
    differ: &'a F,
}

impl<'a, D, F> ReconcileController<'a, D, F>
where
    D: DeviceTransport + ?Sized,
    F: ConfigDiffer + ?Sized,
{
    pub fn new(device: &'a mut D, differ: &'a F) -> Self {
        Self { device, differ }
    }

    /// Runs the request to completion.
    pub async fn run(mut self, request: &ReconcileRequest) -> Result<ReconcileOutcome, ReconcileError> {
        let warnings = request.validate()?;
        let ignore = IgnoreLines::compile(&request.diff_ignore_lines)?;
        let mut outcome = ReconcileOutcome {
            warnings,
            ..ReconcileOutcome::default()
        };

        let diff_against = if request.diff_requested {
            request.diff_against
        } else {
            None
        };

        let snapshot = if request.backup || diff_against == Some(DiffAgainst::Running) {
            let text = self.device.fetch_running_config(request.defaults).await?;
            debug!(bytes = text.len(), defaults = request.defaults, "Captured running config snapshot");
            if request.backup {
                outcome.backup_contents = Some(text.clone());
            }
            Some(RunningSnapshot {
                text,
                include_defaults: request.defaults,
            })
        } else {
            None
        };

        if let Some(source) = request.candidate_source() {
            let candidate = resolve_candidate(request, source);
            let running = self.resolve_running(request, snapshot.as_ref()).await?;
            self.diff_and_apply(request, &candidate, &running, &mut outcome)
                .await?;
        }

        let persisted = self.save_if_required(request, &ignore, &mut outcome).await?;

        if let Some(against) = diff_against {
            self.report_diff(
                request,
                against,
                &ignore,
                snapshot.as_ref(),
                persisted.as_ref(),
                &mut outcome,
            )
            .await?;
        }

        if outcome.changed && let Some(source) = request.candidate_source() {
            let mut hint = IDEMPOTENCY_HINT.to_string();
            if source == CandidateSource::SrcText {
                hint.push_str(" including the indentation");
            }
            outcome.warnings.push(hint);
        }

        Ok(outcome)
    }

    /// Running config to diff against, fetching only when nothing usable is cached.
    async fn resolve_running(
        &mut self,
        request: &ReconcileRequest,
        snapshot: Option<&RunningSnapshot>,
    ) -> Result<String, TransportError> {
        if let Some(running) = &request.running_config_override {
            debug!("Using caller-supplied running config");
            return Ok(running.clone());
        }

        if let Some(snapshot) = snapshot
            && snapshot.include_defaults == request.defaults
        {
            debug!("Reusing running config snapshot");
            return Ok(snapshot.text.clone());
        }

        self.device.fetch_running_config(request.defaults).await
    }

    async fn diff_and_apply(
        &mut self,
        request: &ReconcileRequest,
        candidate: &str,
        running: &str,
        outcome: &mut ReconcileOutcome,
    ) -> Result<(), ReconcileError> {
        let diff = self
            .differ
            .build_config_diff(DiffRequest {
                candidate,
                running,
                match_mode: request.match_mode,
                replace_mode: request.replace_mode,
                ignore_lines: &request.diff_ignore_lines,
                path: &request.parents,
            })
            .await?;

        if diff.is_empty() {
            debug!("Running config already matches candidate");
            return Ok(());
        }

        let banner = diff.banner_diff.filter(|banner| !banner.is_empty());
        let commands: Vec<String> = request
            .before
            .iter()
            .cloned()
            .chain(diff.line_commands)
            .chain(request.after.iter().cloned())
            .collect();

        debug!(
            commands = commands.len(),
            banner = banner.is_some(),
            check_mode = request.check_mode,
            "Computed config changes"
        );

        if !request.check_mode {
            self.apply(&commands, banner.as_deref(), request.delimiter())
                .await?;
        }

        outcome.commands = commands.clone();
        outcome.updates = commands;
        outcome.banners = banner;
        outcome.changed = true;
        Ok(())
    }

    async fn apply(
        &mut self,
        commands: &[String],
        banner: Option<&str>,
        delimiter: char,
    ) -> Result<(), TransportError> {
        if let Some(first) = commands.first() {
            if first.starts_with(MACRO_PREFIX) {
                info!(commands = commands.len(), "Applying macro definition");
                self.device.apply_macro(commands).await?;
            } else {
                info!(commands = commands.len(), "Applying config commands");
                self.device.apply_config_commands(commands).await?;
            }
        }

        if let Some(banner) = banner {
            info!(%delimiter, "Applying banner");
            self.device.apply_banner(banner, delimiter).await?;
        }
        Ok(())
    }

    /// Applies the save decision table. Returns the texts fetched for
    /// `save_when: modified` so the diff step can reuse them.
    async fn save_if_required(
        &mut self,
        request: &ReconcileRequest,
        ignore: &IgnoreLines,
        outcome: &mut ReconcileOutcome,
    ) -> Result<Option<PersistedState>, TransportError> {
        let persisted = if request.save_when == SaveWhen::Modified {
            let running = self.device.fetch_running_config(false).await?;
            let startup = self.device.fetch_startup_config().await?;
            Some(PersistedState {
                running: ConfigText::new(&running, ignore),
                startup: ConfigText::new(&startup, ignore),
            })
        } else {
            None
        };

        let save = save_required(request.save_when, outcome.changed, persisted.as_ref());
        debug!(save_when = %request.save_when, save, "Save decision");

        if save {
            outcome.changed = true;
            if request.check_mode {
                let message = format!(
                    "Skipping command `{SAVE_COMMAND}` due to check_mode.  Configuration not copied to non-volatile storage"
                );
                warn!("{}", message);
                outcome.warnings.push(message);
            } else {
                info!("Saving running config to startup");
                self.device.persist_config().await?;
            }
        }

        Ok(persisted)
    }

    async fn report_diff(
        &mut self,
        request: &ReconcileRequest,
        against: DiffAgainst,
        ignore: &IgnoreLines,
        snapshot: Option<&RunningSnapshot>,
        persisted: Option<&PersistedState>,
        outcome: &mut ReconcileOutcome,
    ) -> Result<(), TransportError> {
        let baseline = match against {
            DiffAgainst::Running if request.check_mode => {
                let message = "unable to perform diff against running-config due to check mode";
                warn!("{}", message);
                outcome.warnings.push(message.to_string());
                return Ok(());
            }
            DiffAgainst::Running => match snapshot {
                Some(snapshot) => ConfigText::new(&snapshot.text, ignore),
                None => return Ok(()),
            },
            DiffAgainst::Startup => match persisted {
                Some(state) => state.startup.clone(),
                None => ConfigText::new(&self.device.fetch_startup_config().await?, ignore),
            },
            DiffAgainst::Intended => match request.intended_config.as_deref() {
                Some(intended) => ConfigText::new(intended, ignore),
                None => return Ok(()),
            },
        };

        // Compare like with like: a running baseline captured with defaults
        // is compared to a running config fetched with defaults.
        let include_defaults = against == DiffAgainst::Running && request.defaults;
        let running = match (persisted, &request.running_config_override) {
            (Some(state), _) if !include_defaults => state.running.clone(),
            (_, Some(running)) => ConfigText::new(running, ignore),
            _ => ConfigText::new(
                &self.device.fetch_running_config(include_defaults).await?,
                ignore,
            ),
        };

        if let Some(report) = diff_report(against, &running, &baseline) {
            debug!(diff_against = %against, "Config differs from baseline");
            outcome.diff = Some(report);
            outcome.changed = true;
        }
        Ok(())
    }
}

/// Candidate text for the request's source.
fn resolve_candidate(request: &ReconcileRequest, source: CandidateSource) -> String {
    match source {
        CandidateSource::SrcText => request.src.clone().unwrap_or_default(),
        CandidateSource::InlineLines => render_candidate(&request.lines, &request.parents),
    }
}
