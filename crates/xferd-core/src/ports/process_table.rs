//! Process table port for port-conflict diagnosis.
//!
//! The conflict diagnoser needs to walk the live OS process table and
//! read each process's open network connections. Visibility is per-item
//! fallible: an unprivileged daemon cannot inspect every process, and a
//! process may exit between enumeration and inspection. Both are normal
//! and must not abort the scan.

use thiserror::Error;

/// One open network connection of a process.
#[derive(Debug, Clone)]
pub struct ConnectionRecord {
    /// Local port of the connection, when the OS exposed it.
    pub local_port: Option<u16>,
}

/// Snapshot of one running process.
///
/// Transient: taken per diagnosis attempt and never cached, because
/// the process table may change under the scan at any time.
#[derive(Debug, Clone)]
pub struct ProcessRecord {
    /// Process identifier.
    pub pid: u32,
    /// Owning user name, when resolvable.
    pub user: Option<String>,
    /// Command line the process was started with.
    pub cmdline: Vec<String>,
    /// Open network connections visible for this process.
    pub connections: Vec<ConnectionRecord>,
}

/// Why a single process could not be inspected.
#[derive(Debug, Clone, Error)]
pub enum ProcessTableError {
    /// The OS denied visibility into this process. Expected for an
    /// unprivileged daemon; callers skip and continue.
    #[error("access denied to process {pid}")]
    AccessDenied {
        /// Process that could not be inspected.
        pid: u32,
    },

    /// The process exited between enumeration and inspection.
    #[error("process {pid} no longer exists")]
    Vanished {
        /// Process that disappeared.
        pid: u32,
    },

    /// The process table itself could not be read.
    #[error("process table unavailable: {0}")]
    Unavailable(String),
}

/// Port for enumerating and inspecting running OS processes.
///
/// Modeled as a sequence of independently-fallible lookups: `pids`
/// gives the enumeration, `inspect` may fail per item without aborting
/// the whole walk.
pub trait ProcessTablePort: Send + Sync {
    /// Identifiers of all currently running processes.
    fn pids(&self) -> Vec<u32>;

    /// Snapshot one process's owner, command line, and connections.
    fn inspect(&self, pid: u32) -> Result<ProcessRecord, ProcessTableError>;
}
