//! Device transport contract.

use crate::command::Command;
use async_trait::async_trait;

/// Errors raised by a device transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The device could not be reached or the session dropped.
    #[error("connection error: {0}")]
    Connection(String),

    /// The device rejected a command.
    #[error("command '{command}' rejected by device: {message}")]
    Rejected { command: String, message: String },

    /// The device did not answer within the transport's deadline.
    #[error("timed out waiting for device: {0}")]
    Timeout(String),
}

/// An exclusively owned session with one network device.
///
/// Every method is a real round trip. Implementations must preserve command
/// order: the `n`th response returned by [`send_commands`] belongs to the
/// `n`th command sent.
///
/// [`send_commands`]: DeviceTransport::send_commands
#[async_trait]
pub trait DeviceTransport: Send {
    /// Sends commands in one round trip and returns one response per command.
    async fn send_commands(&mut self, commands: &[Command]) -> Result<Vec<String>, TransportError>;

    /// Fetches the running configuration.
    ///
    /// When `include_defaults` is true the transport requests the variant that
    /// also lists default values (`show running-config all` on most platforms).
    async fn fetch_running_config(&mut self, include_defaults: bool)
    -> Result<String, TransportError>;

    /// Fetches the startup (persisted) configuration.
    async fn fetch_startup_config(&mut self) -> Result<String, TransportError>;

    /// Pushes configuration commands through the standard edit path.
    async fn apply_config_commands(&mut self, commands: &[String]) -> Result<(), TransportError>;

    /// Pushes a macro definition through the macro edit path.
    async fn apply_macro(&mut self, commands: &[String]) -> Result<(), TransportError>;

    /// Pushes a banner block bounded by `delimiter`.
    async fn apply_banner(&mut self, banner: &str, delimiter: char) -> Result<(), TransportError>;

    /// Copies the running configuration to persistent storage.
    async fn persist_config(&mut self) -> Result<(), TransportError>;
}
