//! Provisioning error kinds surfaced to remote callers.
//!
//! Launch failures are classified into exactly two kinds (port conflict
//! vs. everything else) so the caller can decide retry-on-another-port
//! vs. abandon. Configuration problems are caught before any port is
//! acquired and are never retried.

use thiserror::Error;

/// Errors raised by a provisioning action.
///
/// Every launch-time variant carries the host name, target port, and
/// transfer identifier alongside the underlying diagnostic text.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The server command template is missing or references an
    /// unresolvable placeholder. Raised before any process is launched.
    #[error("configuration error: {detail}")]
    Configuration {
        /// What is wrong with the configured command template.
        detail: String,
    },

    /// The launch failed and another process was confirmed (or strongly
    /// suspected) to already hold the requested port.
    #[error("could not start receiving server on {host} port {port} (transfer {transfer_id}): {detail}")]
    PortInUse {
        /// Host the launch was attempted on.
        host: String,
        /// Port that is already bound.
        port: u16,
        /// Transfer this launch belonged to.
        transfer_id: String,
        /// Raw launcher diagnostic, extended with the owning process when found.
        detail: String,
    },

    /// The launch failed for any reason other than a port conflict.
    #[error("could not start receiving server on {host} port {port} (transfer {transfer_id}): {detail}")]
    Daemon {
        /// Host the launch was attempted on.
        host: String,
        /// Port the launch was bound for (0 when none was resolved).
        port: u16,
        /// Transfer this launch belonged to.
        transfer_id: String,
        /// Raw launcher diagnostic text.
        detail: String,
    },
}

impl ProvisionError {
    /// True when retrying on a different port may succeed.
    #[must_use]
    pub const fn is_port_conflict(&self) -> bool {
        matches!(self, Self::PortInUse { .. })
    }

    /// The underlying diagnostic text, whatever the kind.
    #[must_use]
    pub fn detail(&self) -> &str {
        match self {
            Self::Configuration { detail }
            | Self::PortInUse { detail, .. }
            | Self::Daemon { detail, .. } => detail,
        }
    }
}
