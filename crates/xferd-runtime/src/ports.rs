//! Port allocation utilities.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::net::TcpListener;
use tracing::debug;
use xferd_core::ports::{CallerPort, PortAllocationError};

/// Check if a port is available by attempting to bind to it.
/// Binds and immediately drops the listener, which releases the port.
pub fn is_port_available(port: u16) -> bool {
    match TcpListener::bind(("127.0.0.1", port)) {
        Ok(listener) => listener.local_addr().is_ok(),
        Err(_) => false,
    }
}

/// Obtain a free port from the ephemeral range.
///
/// Binds port 0 and reads back the address the OS assigned. The port is
/// released again before this returns, so the claim is best-effort.
pub fn free_port() -> Result<u16> {
    let listener =
        TcpListener::bind(("127.0.0.1", 0)).context("could not bind an ephemeral port")?;
    let port = listener
        .local_addr()
        .context("could not read the bound address")?
        .port();
    debug!(port = %port, "allocated free port");
    Ok(port)
}

/// Caller-handle port allocation backed by the local ephemeral range.
#[derive(Debug, Clone, Default)]
pub struct EphemeralPortCaller;

#[async_trait]
impl CallerPort for EphemeralPortCaller {
    async fn get_free_port(&self) -> Result<u16, PortAllocationError> {
        free_port().map_err(|err| PortAllocationError(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_port_is_bindable() {
        let port = free_port().unwrap();
        assert!(port > 0);
        assert!(is_port_available(port));
    }

    #[test]
    fn bound_port_is_not_available() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(!is_port_available(port));
    }

    #[tokio::test]
    async fn caller_port_hands_out_ports() {
        let caller = EphemeralPortCaller;
        let port = caller.get_free_port().await.unwrap();
        assert!(port > 0);
    }
}
