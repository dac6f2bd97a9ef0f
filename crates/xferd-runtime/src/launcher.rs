//! Local process launcher.
//!
//! Reference implementation of the launcher port over `tokio::process`:
//! spawns the rendered command with piped stdio, pumps stdout/stderr
//! through line readers into a bounded ring buffer plus a broadcast
//! channel, and verifies startup by polling child liveness and TCP
//! reachability of the bound port.
//!
//! The rendered command line is split on whitespace (program + args);
//! templates that need shell quoting must wrap themselves in an
//! explicit `sh -c`.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, broadcast};
use tokio::time::{Instant, sleep};
use tracing::{debug, info};
use xferd_core::ports::{LaunchFailure, LaunchSpec, LauncherFactoryPort, LauncherPort};

/// Maximum number of log lines kept in the ring buffer.
const MAX_LOG_LINES: usize = 5000;

/// Broadcast channel capacity for the live log feed.
const LOG_CHANNEL_CAPACITY: usize = 1000;

/// Interval between startup readiness polls.
const STARTUP_POLL: Duration = Duration::from_millis(200);

/// Default time the server gets to open its port.
const DEFAULT_STARTUP_GRACE: Duration = Duration::from_secs(30);

/// Launcher that runs the receiving server as a local child process.
pub struct LocalLauncher {
    spec: LaunchSpec,
    startup_grace: Duration,
    child: Mutex<Option<Child>>,
    logs: Arc<RwLock<VecDeque<String>>>,
    last_message: Arc<RwLock<String>>,
    log_tx: broadcast::Sender<String>,
}

impl LocalLauncher {
    /// Create a launcher for one launch specification.
    #[must_use]
    pub fn new(spec: LaunchSpec) -> Self {
        Self::with_startup_grace(spec, DEFAULT_STARTUP_GRACE)
    }

    /// Create a launcher with a custom startup grace period.
    #[must_use]
    pub fn with_startup_grace(spec: LaunchSpec, startup_grace: Duration) -> Self {
        let (log_tx, _) = broadcast::channel(LOG_CHANNEL_CAPACITY);
        Self {
            spec,
            startup_grace,
            child: Mutex::new(None),
            logs: Arc::new(RwLock::new(VecDeque::with_capacity(MAX_LOG_LINES))),
            last_message: Arc::new(RwLock::new(String::new())),
            log_tx,
        }
    }

    /// Spawn the server process. Idempotent: the process is launched at
    /// most once per launcher, whichever execution mode runs first.
    async fn start(&self) -> Result<(), LaunchFailure> {
        let mut guard = self.child.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        let mut parts = self.spec.command.split_whitespace();
        let Some(program) = parts.next() else {
            return Err(self.fail("empty server command".to_string()));
        };
        let mut cmd = Command::new(program);
        cmd.args(parts)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());

        debug!(
            transfer_id = %self.spec.transfer_id,
            port = %self.spec.port,
            user = %self.spec.user,
            command = %self.spec.command,
            "spawning receiving server"
        );
        let mut child = cmd
            .spawn()
            .map_err(|err| self.fail(format!("failed to spawn receiving server: {err}")))?;

        if let Some(stdout) = child.stdout.take() {
            self.spawn_log_reader(stdout, "stdout");
        }
        if let Some(stderr) = child.stderr.take() {
            self.spawn_log_reader(stderr, "stderr");
        }

        *guard = Some(child);
        Ok(())
    }

    fn spawn_log_reader(
        &self,
        stream: impl AsyncRead + Unpin + Send + 'static,
        stream_type: &'static str,
    ) {
        let port = self.spec.port;
        let logs = self.logs.clone();
        let tx = self.log_tx.clone();
        tokio::spawn(async move {
            let reader = BufReader::new(stream);
            let mut lines = reader.lines();
            while let Ok(Some(text)) = lines.next_line().await {
                debug!(port = %port, "{}: {}", stream_type, text);
                {
                    let mut buffer = logs.write().unwrap();
                    if buffer.len() >= MAX_LOG_LINES {
                        buffer.pop_front();
                    }
                    buffer.push_back(text.clone());
                }
                // Ignore send errors: no live subscribers is normal
                let _ = tx.send(text);
            }
            debug!(port = %port, %stream_type, "log reader task exiting");
        });
    }

    /// Poll until the server either opens its port or dies.
    ///
    /// The exit check runs before and after each reachability probe: a
    /// conflicting process keeps the port reachable while our own child
    /// dies, and that must never read as success.
    async fn wait_ready(&self) -> Result<String, LaunchFailure> {
        let deadline = Instant::now() + self.startup_grace;
        loop {
            sleep(STARTUP_POLL).await;

            if let Some(status) = self.poll_exit().await? {
                return Err(self.exited_failure(status).await);
            }

            if TcpStream::connect(("127.0.0.1", self.spec.port)).await.is_ok() {
                if let Some(status) = self.poll_exit().await? {
                    return Err(self.exited_failure(status).await);
                }
                let message =
                    format!("receiving server is listening on port {}", self.spec.port);
                info!(transfer_id = %self.spec.transfer_id, "{message}");
                *self.last_message.write().unwrap() = message;
                return Ok(self.captured_output());
            }

            if Instant::now() >= deadline {
                return Err(self.fail(format!(
                    "server did not open port {} within {:?}",
                    self.spec.port, self.startup_grace
                )));
            }
        }
    }

    async fn poll_exit(&self) -> Result<Option<std::process::ExitStatus>, LaunchFailure> {
        let mut guard = self.child.lock().await;
        match guard.as_mut() {
            None => Err(self.fail("server process was never started".to_string())),
            Some(child) => child
                .try_wait()
                .map_err(|err| self.fail(format!("could not poll server process: {err}"))),
        }
    }

    async fn exited_failure(&self, status: std::process::ExitStatus) -> LaunchFailure {
        // Let the readers drain the final output first
        sleep(Duration::from_millis(100)).await;
        let mut detail = format!("server process exited during startup ({status})");
        let output = self.captured_output();
        if !output.is_empty() {
            detail.push_str(": ");
            detail.push_str(&output);
        }
        self.fail(detail)
    }

    fn captured_output(&self) -> String {
        let buffer = self.logs.read().unwrap();
        buffer.iter().cloned().collect::<Vec<_>>().join("\n")
    }

    fn fail(&self, detail: String) -> LaunchFailure {
        *self.last_message.write().unwrap() = detail.clone();
        LaunchFailure(detail)
    }
}

#[async_trait]
impl LauncherPort for LocalLauncher {
    async fn execute(&self) -> Result<String, LaunchFailure> {
        self.start().await?;
        self.wait_ready().await
    }

    async fn execute_with_log_out(&self) -> Result<broadcast::Receiver<String>, LaunchFailure> {
        // Subscribe before spawning so the feed misses no lines
        let receiver = self.log_tx.subscribe();
        self.start().await?;
        Ok(receiver)
    }

    async fn execute_with_out_log_out(&self) -> Result<String, LaunchFailure> {
        self.start().await?;
        self.wait_ready().await
    }

    fn last_message(&self) -> String {
        self.last_message.read().unwrap().clone()
    }

    fn logs(&self) -> Vec<String> {
        self.logs.read().unwrap().iter().cloned().collect()
    }
}

/// Factory producing [`LocalLauncher`] instances.
#[derive(Debug, Clone)]
pub struct LocalLauncherFactory {
    startup_grace: Duration,
}

impl LocalLauncherFactory {
    /// Create a factory with the default startup grace period.
    #[must_use]
    pub fn new() -> Self {
        Self {
            startup_grace: DEFAULT_STARTUP_GRACE,
        }
    }

    /// Create a factory with a custom startup grace period.
    #[must_use]
    pub const fn with_startup_grace(startup_grace: Duration) -> Self {
        Self { startup_grace }
    }
}

impl Default for LocalLauncherFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl LauncherFactoryPort for LocalLauncherFactory {
    fn create(&self, spec: LaunchSpec) -> Arc<dyn LauncherPort> {
        Arc::new(LocalLauncher::with_startup_grace(spec, self.startup_grace))
    }
}
