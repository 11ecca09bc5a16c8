//! Runs a command request: filter, parse conditions, retry, report.

use crate::command_filter::filter_read_only;
use crate::config::{CommandRequest, ValidationError};
use crate::retry::RetryExecutor;
use netrecon_proto::{
    Conditional, ConditionalParser, DeviceTransport, PredicateSyntaxError, TransportError,
};
use tokio::sync::watch;
use tracing::{debug, info};

/// Result of a successful command run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Always false: running show commands does not change the device.
    pub changed: bool,
    /// One response per command sent, from the last round.
    pub stdout: Vec<String>,
    /// `stdout` split into lines.
    pub stdout_lines: Vec<Vec<String>>,
    pub warnings: Vec<String>,
    /// Rounds sent to the device.
    pub sends: u32,
}

/// Errors that end a command run.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("invalid command request: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    PredicateSyntax(#[from] PredicateSyntaxError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Retries ran out with conditions still pending.
    #[error("One or more conditional statements have not been satisfied")]
    ConditionsUnsatisfied {
        /// Raw expressions of the conditions that never held.
        failed_conditions: Vec<String>,
        /// Responses from the last round, for diagnostics.
        responses: Vec<String>,
    },
}

/// Runs command requests against one device.
pub struct CommandRunner<'a, D: ?Sized, P: ?Sized> {
    device: &'a mut D,
    parser: &'a P,
    interrupt: Option<watch::Receiver<bool>>,
}

impl<'a, D, P> CommandRunner<'a, D, P>
where
    D: DeviceTransport + ?Sized,
    P: ConditionalParser + ?Sized,
{
    pub fn new(device: &'a mut D, parser: &'a P) -> Self {
        Self {
            device,
            parser,
            interrupt: None,
        }
    }

    /// Forwards an interrupt signal to the retry loop.
    pub fn with_interrupt(mut self, interrupt: watch::Receiver<bool>) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    /// Runs `request` to completion.
    ///
    /// Validation, check-mode filtering and condition parsing all happen
    /// before the first command reaches the device.
    pub async fn run(self, request: CommandRequest) -> Result<CommandOutcome, CommandError> {
        let mut warnings = request.validate()?;
        let policy = request.retry_policy()?;

        let commands = if request.check_mode {
            let filtered = filter_read_only(request.commands, &request.read_only_prefixes);
            warnings.extend(filtered.warnings);
            filtered.commands
        } else {
            request.commands
        };

        let conditionals = request
            .wait_for
            .iter()
            .map(|expression| self.parser.parse(expression))
            .collect::<Result<Vec<Box<dyn Conditional>>, _>>()?;

        let mut executor = RetryExecutor::new(policy);
        if let Some(interrupt) = self.interrupt {
            executor = executor.with_interrupt(interrupt);
        }

        debug!(
            commands = commands.len(),
            conditions = conditionals.len(),
            retries = executor.policy().retries,
            interval_ms = executor.policy().interval.as_millis() as u64,
            match_policy = %executor.policy().match_policy,
            "Running commands"
        );
        let outcome = executor.run(self.device, &commands, conditionals).await?;

        if !outcome.pending.is_empty() {
            return Err(CommandError::ConditionsUnsatisfied {
                failed_conditions: outcome.failed_conditions(),
                responses: outcome.responses,
            });
        }

        info!(sends = outcome.sends, "Commands completed");
        let stdout_lines: Vec<Vec<String>> = outcome
            .responses
            .iter()
            .map(|response| response.lines().map(str::to_string).collect())
            .collect();

        Ok(CommandOutcome {
            changed: false,
            stdout: outcome.responses,
            stdout_lines,
            warnings,
            sends: outcome.sends,
        })
    }
}
