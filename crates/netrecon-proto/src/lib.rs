//! # netrecon-proto
//!
//! Contracts between the netrecon controllers and the collaborators they drive.
//!
//! This crate provides:
//! - The `Command` type sent to devices, with optional prompt answering
//! - The `DeviceTransport` trait for command dispatch, config fetch and apply
//! - The `ConfigDiffer` trait for running-to-candidate diff computation
//! - The `Conditional` and `ConditionalParser` traits for wait-for predicates
//!
//! None of the collaborators are implemented here. Transports, diff engines
//! and predicate grammars live outside the workspace and plug in through
//! these traits.

mod command;
mod conditional;
mod device;
mod diff;

pub use command::{AnswerPrompt, Command};
pub use conditional::{Conditional, ConditionalParser, PredicateSyntaxError};
pub use device::{DeviceTransport, TransportError};
pub use diff::{ConfigDiff, ConfigDiffer, DiffError, DiffRequest, MatchMode, ReplaceMode};
