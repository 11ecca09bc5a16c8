//! Conditional retry executor.
//!
//! Sends a fixed command set to the device, evaluates wait-for conditions
//! against the responses and repeats until the conditions hold or the retry
//! budget runs out:
//!
//! ```text
//! Running --(pending empty)--> Satisfied
//! Running --(remaining == 0 or interrupted)--> Exhausted
//! Running --(sleep interval, remaining -= 1)--> Running
//! ```
//!
//! Transport errors are not retried. A failed send aborts the loop.

mod loop_state;
#[cfg(test)]
mod tests;

pub use loop_state::{LoopState, RetryState};

use crate::config::{MatchPolicy, RetryPolicy};
use netrecon_proto::{Command, Conditional, DeviceTransport, TransportError};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

/// How a retry loop ended.
#[derive(Debug)]
pub struct RetryOutcome {
    /// `Satisfied` or `Exhausted`.
    pub state: RetryState,
    /// Responses from the last round sent.
    pub responses: Vec<String>,
    /// Conditions that never held. Empty when satisfied.
    pub pending: Vec<Box<dyn Conditional>>,
    /// Rounds sent to the device.
    pub sends: u32,
    /// Whether the interrupt signal ended the loop.
    pub interrupted: bool,
}

impl RetryOutcome {
    /// Raw expressions of the conditions that never held.
    pub fn failed_conditions(&self) -> Vec<String> {
        self.pending.iter().map(|c| c.raw().to_string()).collect()
    }
}

/// Drives the bounded send-and-evaluate loop.
pub struct RetryExecutor {
    policy: RetryPolicy,
    interrupt: Option<watch::Receiver<bool>>,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            interrupt: None,
        }
    }

    /// Lets the caller cut the loop short.
    ///
    /// Sending `true` aborts the current inter-retry sleep and ends the loop
    /// as `Exhausted`. An in-flight send is never interrupted.
    pub fn with_interrupt(mut self, interrupt: watch::Receiver<bool>) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs the loop until `conditionals` hold or retries are exhausted.
    ///
    /// With no conditionals the first round succeeds.
    pub async fn run<D>(
        &mut self,
        device: &mut D,
        commands: &[Command],
        conditionals: Vec<Box<dyn Conditional>>,
    ) -> Result<RetryOutcome, TransportError>
    where
        D: DeviceTransport + ?Sized,
    {
        let mut state = LoopState::new(self.policy.retries);
        let mut pending = conditionals;

        loop {
            let responses = device.send_commands(commands).await?;
            state.sends += 1;

            let before = pending.len();
            pending = evaluate_round(pending, &responses, self.policy.match_policy);
            debug!(
                send = state.sends,
                satisfied = before - pending.len(),
                pending = pending.len(),
                remaining = state.remaining,
                "Evaluated wait_for conditions"
            );

            if pending.is_empty() {
                state.state = RetryState::Satisfied;
            } else if state.remaining == 0 {
                state.state = RetryState::Exhausted;
            } else if self.wait_interval().await {
                state.interrupted = true;
                state.state = RetryState::Exhausted;
            } else {
                state.remaining -= 1;
                continue;
            }

            if state.state == RetryState::Exhausted {
                warn!(
                    state = state.state.as_str(),
                    sends = state.sends,
                    pending = pending.len(),
                    interrupted = state.interrupted,
                    elapsed_ms = state.elapsed().as_millis() as u64,
                    "Retry loop exhausted with conditions still pending"
                );
            }

            return Ok(RetryOutcome {
                state: state.state,
                responses,
                pending,
                sends: state.sends,
                interrupted: state.interrupted,
            });
        }
    }

    /// Sleeps for the retry interval. Returns true if interrupted.
    async fn wait_interval(&mut self) -> bool {
        let interval = self.policy.interval;
        let Some(interrupt) = self.interrupt.as_mut() else {
            tokio::time::sleep(interval).await;
            return false;
        };
        wait_or_interrupt(interval, interrupt).await
    }
}

async fn wait_or_interrupt(interval: Duration, interrupt: &mut watch::Receiver<bool>) -> bool {
    if *interrupt.borrow_and_update() {
        return true;
    }

    let sleep = tokio::time::sleep(interval);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            () = &mut sleep => return false,
            changed = interrupt.changed() => match changed {
                Ok(()) if *interrupt.borrow_and_update() => return true,
                Ok(()) => {}
                Err(_) => {
                    // Sender gone; nobody can interrupt any more.
                    (&mut sleep).await;
                    return false;
                }
            },
        }
    }
}

/// Evaluates every pending condition against one response snapshot and
/// returns the conditions still pending afterwards.
///
/// All conditions are evaluated, in order, before the pending set is
/// recomputed.
fn evaluate_round(
    pending: Vec<Box<dyn Conditional>>,
    responses: &[String],
    policy: MatchPolicy,
) -> Vec<Box<dyn Conditional>> {
    let results: Vec<bool> = pending.iter().map(|c| c.evaluate(responses)).collect();

    match policy {
        MatchPolicy::Any if results.iter().any(|held| *held) => Vec::new(),
        MatchPolicy::Any => pending,
        MatchPolicy::All => pending
            .into_iter()
            .zip(results)
            .filter_map(|(condition, held)| (!held).then_some(condition))
            .collect(),
    }
}
