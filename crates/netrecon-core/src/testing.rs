//! Scripted collaborators for exercising the controllers without a device.
//!
//! `ScriptedDevice` records every call it receives and plays back configured
//! responses. Applying configuration switches the running config to the
//! scripted post-apply text, and persisting copies running to startup, so a
//! whole reconcile run behaves like a small device.

use async_trait::async_trait;
use netrecon_proto::{
    Command, Conditional, ConditionalParser, ConfigDiff, ConfigDiffer, DeviceTransport, DiffError,
    DiffRequest, MatchMode, PredicateSyntaxError, ReplaceMode, TransportError,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

/// A call received by [`ScriptedDevice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    SendCommands(Vec<String>),
    FetchRunningConfig { include_defaults: bool },
    FetchStartupConfig,
    ApplyConfig(Vec<String>),
    ApplyMacro(Vec<String>),
    ApplyBanner { banner: String, delimiter: char },
    PersistConfig,
}

/// Device operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Send,
    FetchRunning,
    FetchStartup,
    ApplyConfig,
    ApplyMacro,
    ApplyBanner,
    Persist,
}

/// In-memory device with scripted responses.
#[derive(Debug, Default)]
pub struct ScriptedDevice {
    rounds: VecDeque<Vec<String>>,
    last_round: Option<Vec<String>>,
    running: String,
    running_after_apply: Option<String>,
    running_with_defaults: Option<String>,
    startup: String,
    failures: HashMap<Operation, TransportError>,
    fail_on_round: Option<(u32, TransportError)>,
    calls: Vec<DeviceCall>,
}

impl ScriptedDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the responses for the next send round.
    ///
    /// Once the queue is drained the last round repeats. Without any round
    /// every command answers with an empty string.
    pub fn respond_with<I, S>(mut self, responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rounds
            .push_back(responses.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_running_config(mut self, running: impl Into<String>) -> Self {
        self.running = running.into();
        self
    }

    /// Running config returned by fetches that include defaults.
    pub fn with_running_config_defaults(mut self, running: impl Into<String>) -> Self {
        self.running_with_defaults = Some(running.into());
        self
    }

    /// Running config the device reports once any apply call succeeded.
    pub fn with_running_config_after_apply(mut self, running: impl Into<String>) -> Self {
        self.running_after_apply = Some(running.into());
        self
    }

    pub fn with_startup_config(mut self, startup: impl Into<String>) -> Self {
        self.startup = startup.into();
        self
    }

    /// Makes every call of `operation` fail with `error`.
    pub fn fail_on(mut self, operation: Operation, error: TransportError) -> Self {
        self.failures.insert(operation, error);
        self
    }

    /// Makes the `round`th send (1-based) fail with `error`.
    pub fn fail_on_round(mut self, round: u32, error: TransportError) -> Self {
        self.fail_on_round = Some((round, error));
        self
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    pub fn send_count(&self) -> usize {
        self.count(|call| matches!(call, DeviceCall::SendCommands(_)))
    }

    pub fn running_fetch_count(&self) -> usize {
        self.count(|call| matches!(call, DeviceCall::FetchRunningConfig { .. }))
    }

    pub fn startup_fetch_count(&self) -> usize {
        self.count(|call| matches!(call, DeviceCall::FetchStartupConfig))
    }

    pub fn persist_count(&self) -> usize {
        self.count(|call| matches!(call, DeviceCall::PersistConfig))
    }

    /// True if any configuration, macro or banner edit reached the device.
    pub fn applied_anything(&self) -> bool {
        self.count(|call| {
            matches!(
                call,
                DeviceCall::ApplyConfig(_) | DeviceCall::ApplyMacro(_) | DeviceCall::ApplyBanner { .. }
            )
        }) > 0
    }

    fn count(&self, predicate: impl Fn(&DeviceCall) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }

    fn check(&self, operation: Operation) -> Result<(), TransportError> {
        match self.failures.get(&operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn after_apply(&mut self) {
        if let Some(running) = self.running_after_apply.take() {
            self.running = running;
        }
    }
}

#[async_trait]
impl DeviceTransport for ScriptedDevice {
    async fn send_commands(&mut self, commands: &[Command]) -> Result<Vec<String>, TransportError> {
        self.calls.push(DeviceCall::SendCommands(
            commands.iter().map(|c| c.text().to_string()).collect(),
        ));
        self.check(Operation::Send)?;
        if let Some((round, error)) = &self.fail_on_round
            && *round as usize == self.send_count()
        {
            return Err(error.clone());
        }

        if let Some(round) = self.rounds.pop_front() {
            self.last_round = Some(round);
        }
        Ok(match &self.last_round {
            Some(round) => round.clone(),
            None => vec![String::new(); commands.len()],
        })
    }

    async fn fetch_running_config(
        &mut self,
        include_defaults: bool,
    ) -> Result<String, TransportError> {
        self.calls
            .push(DeviceCall::FetchRunningConfig { include_defaults });
        self.check(Operation::FetchRunning)?;
        match (&self.running_with_defaults, include_defaults) {
            (Some(full), true) => Ok(full.clone()),
            _ => Ok(self.running.clone()),
        }
    }

    async fn fetch_startup_config(&mut self) -> Result<String, TransportError> {
        self.calls.push(DeviceCall::FetchStartupConfig);
        self.check(Operation::FetchStartup)?;
        Ok(self.startup.clone())
    }

    async fn apply_config_commands(&mut self, commands: &[String]) -> Result<(), TransportError> {
        self.calls.push(DeviceCall::ApplyConfig(commands.to_vec()));
        self.check(Operation::ApplyConfig)?;
        self.after_apply();
        Ok(())
    }

    async fn apply_macro(&mut self, commands: &[String]) -> Result<(), TransportError> {
        self.calls.push(DeviceCall::ApplyMacro(commands.to_vec()));
        self.check(Operation::ApplyMacro)?;
        self.after_apply();
        Ok(())
    }

    async fn apply_banner(&mut self, banner: &str, delimiter: char) -> Result<(), TransportError> {
        self.calls.push(DeviceCall::ApplyBanner {
            banner: banner.to_string(),
            delimiter,
        });
        self.check(Operation::ApplyBanner)?;
        self.after_apply();
        Ok(())
    }

    async fn persist_config(&mut self) -> Result<(), TransportError> {
        self.calls.push(DeviceCall::PersistConfig);
        self.check(Operation::Persist)?;
        self.startup = self.running.clone();
        Ok(())
    }
}

/// Owned copy of a [`DiffRequest`] seen by [`StaticDiffer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedDiffRequest {
    pub candidate: String,
    pub running: String,
    pub match_mode: MatchMode,
    pub replace_mode: ReplaceMode,
    pub ignore_lines: Vec<String>,
    pub path: Vec<String>,
}

/// Diff collaborator that returns a fixed result.
#[derive(Debug)]
pub struct StaticDiffer {
    result: Result<ConfigDiff, DiffError>,
    requests: Mutex<Vec<RecordedDiffRequest>>,
}

impl StaticDiffer {
    /// A differ that finds nothing to change.
    pub fn empty() -> Self {
        Self::returning(ConfigDiff::default())
    }

    /// A differ that returns only line commands.
    pub fn lines<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::returning(ConfigDiff {
            line_commands: commands.into_iter().map(Into::into).collect(),
            banner_diff: None,
        })
    }

    pub fn returning(diff: ConfigDiff) -> Self {
        Self {
            result: Ok(diff),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            result: Err(DiffError(message.into())),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<RecordedDiffRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ConfigDiffer for StaticDiffer {
    async fn build_config_diff(&self, request: DiffRequest<'_>) -> Result<ConfigDiff, DiffError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedDiffRequest {
                candidate: request.candidate.to_string(),
                running: request.running.to_string(),
                match_mode: request.match_mode,
                replace_mode: request.replace_mode,
                ignore_lines: request.ignore_lines.to_vec(),
                path: request.path.to_vec(),
            });
        self.result.clone()
    }
}

type Predicate = Arc<dyn Fn(&[String]) -> bool + Send + Sync>;

/// A conditional backed by a closure.
#[derive(Clone)]
pub struct FnConditional {
    raw: String,
    predicate: Predicate,
}

impl FnConditional {
    pub fn new(
        raw: impl Into<String>,
        predicate: impl Fn(&[String]) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            raw: raw.into(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn boxed(self) -> Box<dyn Conditional> {
        Box::new(self)
    }
}

impl Conditional for FnConditional {
    fn evaluate(&self, responses: &[String]) -> bool {
        (self.predicate)(responses)
    }

    fn raw(&self) -> &str {
        &self.raw
    }
}

/// Conditional parser that only knows the expressions registered with it.
#[derive(Default, Clone)]
pub struct PredicateTable {
    entries: HashMap<String, Predicate>,
}

impl PredicateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `expression` with the closure that decides it.
    pub fn with(
        mut self,
        expression: impl Into<String>,
        predicate: impl Fn(&[String]) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.entries.insert(expression.into(), Arc::new(predicate));
        self
    }
}

impl ConditionalParser for PredicateTable {
    fn parse(&self, expression: &str) -> Result<Box<dyn Conditional>, PredicateSyntaxError> {
        match self.entries.get(expression) {
            Some(predicate) => Ok(Box::new(FnConditional {
                raw: expression.to_string(),
                predicate: Arc::clone(predicate),
            })),
            None => Err(PredicateSyntaxError::new(
                expression,
                "unrecognized conditional expression",
            )),
        }
    }
}
