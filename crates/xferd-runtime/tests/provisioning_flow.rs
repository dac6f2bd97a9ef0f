//! End-to-end provisioning flows over the real launcher, port
//! allocator, and process table.

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::StreamExt;
use xferd_core::ports::{MapConfig, NoopMetricsSink, keys};
use xferd_core::{STATUS_SUCCESS, TransferRequest};
use xferd_runtime::{
    EphemeralPortCaller, LocalLauncherFactory, ProvisioningAction, SystemProcessTable,
};

fn action_for(template: &str, port: u16) -> ProvisioningAction {
    let config = Arc::new(
        MapConfig::new()
            .with(keys::SERVER_COMMAND, template)
            .with(keys::HOSTNAME, "testhost"),
    );
    let request =
        TransferRequest::new("T1", "gridwriter").with_port_server(port.to_string());
    ProvisioningAction::new(
        request,
        Arc::new(EphemeralPortCaller),
        config,
        Arc::new(NoopMetricsSink),
        Arc::new(LocalLauncherFactory::with_startup_grace(Duration::from_secs(3))),
        Arc::new(SystemProcessTable::new()),
    )
}

#[tokio::test]
#[cfg(unix)]
async fn provisions_a_server_end_to_end() {
    // Stand in for the server binding its port
    let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
    let port = listener.local_addr().unwrap().port();

    let mut action = action_for("sleep 3", port);
    let result = action.execute().await.unwrap();

    assert_eq!(result.status, STATUS_SUCCESS);
    assert_eq!(result.server_port, Some(port));
    assert_eq!(action.status(), STATUS_SUCCESS);
    assert_eq!(action.host(), "testhost");
    assert!(action.last_message().contains("listening"));
}

#[tokio::test]
#[cfg(target_os = "linux")]
async fn attributes_a_port_conflict_to_the_owning_process() {
    // Hold the port ourselves so the scan finds this test process
    let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
    let port = listener.local_addr().unwrap().port();

    // The launched command reports the collision the way a real server
    // would, then exits
    let mut action = action_for("echo Address already in use", port);
    let err = action.execute().await.unwrap_err();

    assert!(err.is_port_conflict());
    assert!(err.to_string().contains("testhost"));
    assert!(
        err.detail()
            .contains(&format!("process {} occupies port {port}", std::process::id()))
    );
}

#[tokio::test]
#[cfg(unix)]
async fn streams_live_log_lines_on_request() {
    let port = xferd_runtime::free_port().unwrap();
    let mut action = action_for("seq 1 20", port);

    let mut lines = action.execute_with_log_out().await.unwrap();
    assert_eq!(lines.next().await.as_deref(), Some("1"));
    assert_eq!(lines.next().await.as_deref(), Some("2"));
    assert_eq!(lines.next().await.as_deref(), Some("3"));
    // Partial consumption: dropping the stream is the only cancel signal
}
