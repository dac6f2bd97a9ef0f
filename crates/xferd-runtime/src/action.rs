//! The provisioning action state machine.
//!
//! One action instance serves exactly one transfer request: it resolves
//! a listening port, renders the server command, delegates the launch,
//! classifies failures, and packages the result. Instances are not
//! reusable; create a new action per request.

use crate::command::{render_command, validate_template};
use crate::conflict::ConflictDiagnoser;
use crate::host::host_name;
use crate::preflight::probe_dest_files;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, error, info};
use xferd_core::ports::{
    CallerPort, ConfigPort, LaunchFailure, LaunchSpec, LauncherFactoryPort, LauncherPort,
    MetricsSinkPort, ProcessTablePort, keys,
};
use xferd_core::{
    ProvisionError, STATUS_FAILED, STATUS_PENDING, STATUS_SUCCESS, TransferRequest, TransferResult,
};

/// Metric group the startup timing sample is reported under.
const METRIC_GROUP: &str = "receiving_server";

/// Lifecycle of one provisioning action.
///
/// Transitions are one-directional with no re-entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProvisioningState {
    /// Action created, nothing resolved yet.
    Initialized,
    /// Listening port resolved (explicit or allocated).
    PortAcquired,
    /// Server command rendered against the resolved port.
    CommandBuilt,
    /// Launch delegated to the launcher.
    Launching,
    /// Server confirmed running.
    Succeeded,
    /// Launch failed; the error has been classified.
    Failed,
}

/// Provisions one data-receiving server for one transfer request.
pub struct ProvisioningAction {
    request: TransferRequest,
    caller: Arc<dyn CallerPort>,
    config: Arc<dyn ConfigPort>,
    metrics: Arc<dyn MetricsSinkPort>,
    launcher_factory: Arc<dyn LauncherFactoryPort>,
    diagnoser: ConflictDiagnoser,
    state: ProvisioningState,
    status: i32,
    port: Option<u16>,
    launcher: Option<Arc<dyn LauncherPort>>,
}

impl ProvisioningAction {
    /// Create an action for one transfer request.
    #[must_use]
    pub fn new(
        request: TransferRequest,
        caller: Arc<dyn CallerPort>,
        config: Arc<dyn ConfigPort>,
        metrics: Arc<dyn MetricsSinkPort>,
        launcher_factory: Arc<dyn LauncherFactoryPort>,
        process_table: Arc<dyn ProcessTablePort>,
    ) -> Self {
        Self {
            request,
            caller,
            config,
            metrics,
            launcher_factory,
            diagnoser: ConflictDiagnoser::new(process_table),
            state: ProvisioningState::Initialized,
            status: STATUS_PENDING,
            port: None,
            launcher: None,
        }
    }

    /// Run the provisioning to completion and return the result record.
    ///
    /// Blocks (asynchronously) until the launched server has either
    /// started or failed. On failure, no cleanup or port release is
    /// attempted here; releasing a partially-started process belongs to
    /// the out-of-band cleanup collaborator.
    pub async fn execute(&mut self) -> Result<TransferResult, ProvisionError> {
        let started = Instant::now();
        let launcher = self.prepare().await?;
        self.advance(ProvisioningState::Launching);

        match launcher.execute().await {
            Err(failure) => Err(self.classify_failure(&failure)),
            Ok(output) => {
                self.advance(ProvisioningState::Succeeded);
                self.status = STATUS_SUCCESS;
                let port = self.port.unwrap_or(0);
                let result =
                    TransferResult::success(self.request.transfer_id.clone(), port, output);
                debug!(transfer_id = %self.request.transfer_id, port = %port, "response to caller prepared");

                let elapsed = started.elapsed().as_secs();
                debug!(elapsed_s = %elapsed, "starting receiving server lasted");
                self.emit_startup_metric(elapsed);
                Ok(result)
            }
        }
    }

    /// Run the provisioning while feeding log lines back live.
    ///
    /// The returned stream is lazy, forward-only, and restartable per
    /// call (each call gets a fresh subscription, not a resumed one).
    /// Dropping it cancels consumption without affecting the launched
    /// process. Use either this or `execute`, not both, per action.
    pub async fn execute_with_log_out(
        &mut self,
    ) -> Result<Pin<Box<dyn Stream<Item = String> + Send>>, ProvisionError> {
        let launcher = self.prepare().await?;
        if self.state < ProvisioningState::Launching {
            self.advance(ProvisioningState::Launching);
        }
        match launcher.execute_with_log_out().await {
            Ok(receiver) => Ok(Box::pin(BroadcastStream::new(receiver).filter_map(Result::ok))),
            Err(failure) => Err(self.classify_failure(&failure)),
        }
    }

    /// Run the provisioning and return the complete buffered output
    /// once execution has finished.
    pub async fn execute_with_out_log_out(&mut self) -> Result<String, ProvisionError> {
        let launcher = self.prepare().await?;
        self.advance(ProvisioningState::Launching);
        match launcher.execute_with_out_log_out().await {
            Ok(output) => {
                self.advance(ProvisioningState::Succeeded);
                self.status = STATUS_SUCCESS;
                Ok(output)
            }
            Err(failure) => Err(self.classify_failure(&failure)),
        }
    }

    /// Everything that must happen before the launch: template
    /// validation, port resolution, pre-flight probing, command
    /// rendering, launcher creation. Runs once per action.
    async fn prepare(&mut self) -> Result<Arc<dyn LauncherPort>, ProvisionError> {
        if let Some(launcher) = &self.launcher {
            return Ok(launcher.clone());
        }

        let template = self.config.get(keys::SERVER_COMMAND).ok_or_else(|| {
            ProvisionError::Configuration {
                detail: format!("`{}` is not configured", keys::SERVER_COMMAND),
            }
        })?;
        // A broken template must surface before a port is acquired
        validate_template(&template)?;

        let port = self.resolve_port().await?;
        self.advance(ProvisioningState::PortAcquired);
        self.port = Some(port);

        info!(
            transfer_id = %self.request.transfer_id,
            "checking presence of files at target location"
        );
        debug!("results:\n{}", probe_dest_files(&self.request.dest_files));

        let user = self.request.dest_grid_user.clone();
        debug!(user = %user, "local grid user resolved");
        let command = render_command(&template, &self.command_values(port, &user))?;
        self.advance(ProvisioningState::CommandBuilt);
        debug!(command = %command, "server command rendered");

        let spec = LaunchSpec::new(self.request.transfer_id.clone(), command, port, user);
        let launcher = self.launcher_factory.create(spec);
        self.launcher = Some(launcher.clone());
        Ok(launcher)
    }

    /// Resolve the listening port.
    ///
    /// An explicit, integer-parseable port wins as given, without an
    /// availability pre-check. A non-integer explicit port is logged
    /// and downgraded to dynamic allocation rather than failing the
    /// request.
    async fn resolve_port(&self) -> Result<u16, ProvisionError> {
        if let Some(raw) = self.request.port_server.as_deref().filter(|raw| !raw.is_empty()) {
            info!(port = %raw, "forcing user specified port");
            match raw.trim().parse::<u16>() {
                Ok(port) => return Ok(port),
                Err(err) => {
                    info!(
                        port = %raw,
                        error = %err,
                        "explicit port is not an integer, falling back to dynamic allocation"
                    );
                }
            }
        } else {
            info!("requesting a free port");
        }
        self.caller
            .get_free_port()
            .await
            .map_err(|err| ProvisionError::Daemon {
                host: self.host(),
                port: 0,
                transfer_id: self.request.transfer_id.clone(),
                detail: format!("could not allocate a listening port: {err}"),
            })
    }

    fn command_values(&self, port: u16, user: &str) -> HashMap<&'static str, String> {
        let dest_files = self
            .request
            .dest_files
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>()
            .join(" ");
        HashMap::from([
            ("transfer_id", self.request.transfer_id.clone()),
            ("port", port.to_string()),
            ("sudo_user", user.to_string()),
            ("mon_id", self.request.monitor_id().to_string()),
            (
                "mon_dest",
                self.config.get(keys::MONITOR_DESTINATIONS).unwrap_or_default(),
            ),
            ("dest_files", dest_files),
        ])
    }

    /// Turn a raw launch failure into the error kind the caller sees.
    fn classify_failure(&mut self, failure: &LaunchFailure) -> ProvisionError {
        self.advance(ProvisioningState::Failed);
        self.status = STATUS_FAILED;

        let port = self.port.unwrap_or(0);
        let verdict = self.diagnoser.diagnose(port, &failure.0);
        let host = self.host();
        error!(
            transfer_id = %self.request.transfer_id,
            host = %host,
            port = %port,
            "could not start receiving server: {}",
            verdict.diagnostic
        );

        if verdict.is_conflict {
            ProvisionError::PortInUse {
                host,
                port,
                transfer_id: self.request.transfer_id.clone(),
                detail: verdict.diagnostic,
            }
        } else {
            ProvisionError::Daemon {
                host,
                port,
                transfer_id: self.request.transfer_id.clone(),
                detail: verdict.diagnostic,
            }
        }
    }

    /// Best-effort startup timing sample; failures stay in the sink.
    fn emit_startup_metric(&self, elapsed_secs: u64) {
        let params = HashMap::from([
            ("id".to_string(), self.request.transfer_id.clone()),
            ("server_init_seconds".to_string(), elapsed_secs.to_string()),
        ]);
        self.metrics.send_parameters(METRIC_GROUP, None, &params);
    }

    fn advance(&mut self, next: ProvisioningState) {
        debug_assert!(self.state < next, "state machine must move forward");
        debug!(from = ?self.state, to = ?next, "provisioning state transition");
        self.state = next;
    }

    /// Transfer identifier this action serves.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.request.transfer_id
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ProvisioningState {
        self.state
    }

    /// Status code: pending, success, or the failure sentinel.
    #[must_use]
    pub const fn status(&self) -> i32 {
        self.status
    }

    /// Host name used in reports (configured override or OS name).
    #[must_use]
    pub fn host(&self) -> String {
        host_name(self.config.as_ref())
    }

    /// The resolved server port, once acquired.
    #[must_use]
    pub const fn server_port(&self) -> Option<u16> {
        self.port
    }

    /// The launcher's most recent status or failure message.
    #[must_use]
    pub fn last_message(&self) -> String {
        self.launcher
            .as_ref()
            .map(|launcher| launcher.last_message())
            .unwrap_or_default()
    }

    /// Log lines captured by the launcher so far.
    #[must_use]
    pub fn logs(&self) -> Vec<String> {
        self.launcher
            .as_ref()
            .map(|launcher| launcher.logs())
            .unwrap_or_default()
    }
}
