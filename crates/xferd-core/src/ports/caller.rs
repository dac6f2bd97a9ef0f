//! Caller handle port for free-port allocation.
//!
//! The remote caller owns the port-allocation policy; this port is the
//! only piece of it the provisioning action consumes.

use async_trait::async_trait;
use thiserror::Error;

/// No listening port could be handed out.
#[derive(Debug, Clone, Error)]
#[error("no free port available: {0}")]
pub struct PortAllocationError(pub String);

/// Port for asking the caller handle for a free listening port.
#[async_trait]
pub trait CallerPort: Send + Sync {
    /// Return a currently unused local port.
    ///
    /// The port namespace is OS-global and unlocked, so the returned
    /// port is a best-effort claim; true arbitration happens when the
    /// launched process binds it.
    async fn get_free_port(&self) -> Result<u16, PortAllocationError>;
}
