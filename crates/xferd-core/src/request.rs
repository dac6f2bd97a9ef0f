//! Transfer request parameters.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Parameters of one provisioning request, as sent by the remote caller.
///
/// This is an intent-based record: it expresses what the caller wants,
/// not how the server should be started. It is immutable after setup;
/// the provisioning action only borrows it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Opaque identifier naming this transfer end-to-end.
    pub transfer_id: String,
    /// Grid user the receiving server runs as at the destination.
    pub dest_grid_user: String,
    /// Files the transfer will write at the destination.
    pub dest_files: Vec<PathBuf>,
    /// Explicit server port requested by the caller, as received on the
    /// wire. May be absent or non-numeric; a non-numeric value falls
    /// back to dynamic allocation rather than failing the request.
    pub port_server: Option<String>,
    /// Monitoring identifier (defaults to the transfer identifier).
    pub mon_id: Option<String>,
}

impl TransferRequest {
    /// Create a new request with required fields.
    #[must_use]
    pub fn new(transfer_id: impl Into<String>, dest_grid_user: impl Into<String>) -> Self {
        Self {
            transfer_id: transfer_id.into(),
            dest_grid_user: dest_grid_user.into(),
            dest_files: Vec::new(),
            port_server: None,
            mon_id: None,
        }
    }

    /// Set the destination file paths.
    #[must_use]
    pub fn with_dest_files(mut self, files: Vec<PathBuf>) -> Self {
        self.dest_files = files;
        self
    }

    /// Set an explicit server port.
    #[must_use]
    pub fn with_port_server(mut self, port: impl Into<String>) -> Self {
        self.port_server = Some(port.into());
        self
    }

    /// Set the monitoring identifier.
    #[must_use]
    pub fn with_mon_id(mut self, mon_id: impl Into<String>) -> Self {
        self.mon_id = Some(mon_id.into());
        self
    }

    /// The monitoring identifier, falling back to the transfer identifier.
    #[must_use]
    pub fn monitor_id(&self) -> &str {
        self.mon_id.as_deref().unwrap_or(&self.transfer_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_all_fields() {
        let request = TransferRequest::new("T1", "gridwriter")
            .with_dest_files(vec![PathBuf::from("/tmp/out.dat")])
            .with_port_server("5001")
            .with_mon_id("M1");
        assert_eq!(request.transfer_id, "T1");
        assert_eq!(request.dest_grid_user, "gridwriter");
        assert_eq!(request.dest_files.len(), 1);
        assert_eq!(request.port_server.as_deref(), Some("5001"));
        assert_eq!(request.monitor_id(), "M1");
    }

    #[test]
    fn monitor_id_falls_back_to_transfer_id() {
        let request = TransferRequest::new("T2", "gridwriter");
        assert_eq!(request.monitor_id(), "T2");
    }
}
