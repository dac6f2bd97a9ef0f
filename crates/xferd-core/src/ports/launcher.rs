//! Launcher port: the external process launcher contract.
//!
//! The launcher starts and supervises the actual data-receiving server
//! process. The provisioning action only ever talks to it through this
//! port, which keeps the action testable and the launcher swappable
//! (local process, containerized, remote).

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

/// Opaque diagnostic text reported by a failed launch.
///
/// The launcher does not classify its failures; attributing a failure to
/// a port conflict is the conflict diagnoser's job.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct LaunchFailure(pub String);

/// Everything a launcher needs to start one receiving server.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    /// Transfer this launch belongs to.
    pub transfer_id: String,
    /// Fully rendered command line to invoke.
    pub command: String,
    /// Port the server must bind.
    pub port: u16,
    /// Local user identity the server runs as.
    pub user: String,
}

impl LaunchSpec {
    /// Create a new launch specification.
    #[must_use]
    pub fn new(
        transfer_id: impl Into<String>,
        command: impl Into<String>,
        port: u16,
        user: impl Into<String>,
    ) -> Self {
        Self {
            transfer_id: transfer_id.into(),
            command: command.into(),
            port,
            user: user.into(),
        }
    }
}

/// Port for executing one launched server process.
///
/// All three execution methods drive the same single underlying process;
/// they are alternative consumption strategies, not independent launches.
#[async_trait]
pub trait LauncherPort: Send + Sync {
    /// Start the process and block until startup has been confirmed.
    ///
    /// Returns the output captured up to that point, or the raw
    /// diagnostic text when the launch failed.
    async fn execute(&self) -> Result<String, LaunchFailure>;

    /// Start the process and return a live feed of its log lines.
    ///
    /// Each call yields a fresh forward-only subscription starting at
    /// the current position of the feed; a consumer cancels by dropping
    /// the receiver, which leaves the process itself unaffected.
    async fn execute_with_log_out(&self) -> Result<broadcast::Receiver<String>, LaunchFailure>;

    /// Start the process and block until completion, returning the full
    /// buffered output in one piece.
    async fn execute_with_out_log_out(&self) -> Result<String, LaunchFailure>;

    /// The most recent launcher status or failure message.
    fn last_message(&self) -> String;

    /// All log lines captured so far.
    fn logs(&self) -> Vec<String>;
}

/// Port for creating a launcher bound to one launch specification.
///
/// The action resolves the port and renders the command before the
/// launcher exists, so launchers are created per launch rather than
/// injected up front.
pub trait LauncherFactoryPort: Send + Sync {
    /// Create a launcher for the given specification.
    fn create(&self, spec: LaunchSpec) -> Arc<dyn LauncherPort>;
}
