//! Port-conflict diagnosis.
//!
//! The launcher reports failures as opaque text. When that text carries
//! the address-in-use signature, the diagnoser walks the live process
//! table to attribute the busy port to an owning process. The scan is
//! inherently racy (the owner may exit, or a new process may bind the
//! port, between the failure and the scan); that is an accepted
//! limitation, not a bug.

use std::sync::Arc;
use std::time::Instant;
use tracing::debug;
use xferd_core::ports::{ProcessTableError, ProcessTablePort};

/// Failure-text signature that triggers a process-table scan.
///
/// Conflict detection is only attempted for this one failure class; any
/// other text short-circuits to "not a conflict".
pub const ADDRESS_IN_USE: &str = "Address already in use";

/// Outcome of one diagnosis attempt. Ephemeral, never persisted.
#[derive(Debug, Clone)]
pub struct ConflictVerdict {
    /// Whether the failure is attributable to a port conflict.
    pub is_conflict: bool,
    /// Process found holding the port, if any.
    pub owner_pid: Option<u32>,
    /// Owning user of that process.
    pub owner_user: Option<String>,
    /// Command line of that process.
    pub owner_cmdline: Option<String>,
    /// Failure text, extended with the owner description when found.
    pub diagnostic: String,
}

impl ConflictVerdict {
    fn no_conflict(diagnostic: String) -> Self {
        Self {
            is_conflict: false,
            owner_pid: None,
            owner_user: None,
            owner_cmdline: None,
            diagnostic,
        }
    }
}

/// Diagnoses whether a launch failure is a port collision.
pub struct ConflictDiagnoser {
    table: Arc<dyn ProcessTablePort>,
}

impl ConflictDiagnoser {
    /// Create a diagnoser over the given process table.
    #[must_use]
    pub fn new(table: Arc<dyn ProcessTablePort>) -> Self {
        Self { table }
    }

    /// Classify a launch failure against the target port.
    ///
    /// First process with a connection on `port` wins; the scan stops
    /// there rather than searching for further owners. Processes the OS
    /// refuses to show are skipped silently; unprivileged visibility
    /// is expected and normal.
    #[must_use]
    pub fn diagnose(&self, port: u16, failure_text: &str) -> ConflictVerdict {
        debug!(port = %port, "checking failure text for '{}'", ADDRESS_IN_USE);
        if !failure_text.contains(ADDRESS_IN_USE) {
            debug!("signature not found, different failure");
            return ConflictVerdict::no_conflict(failure_text.to_string());
        }

        debug!("port conflict signature detected, analyzing running processes");
        let started = Instant::now();
        let pids = self.table.pids();
        debug!(count = %pids.len(), "going to check processes");

        for pid in pids {
            let record = match self.table.inspect(pid) {
                Ok(record) => record,
                Err(ProcessTableError::AccessDenied { .. }) => {
                    debug!(pid = %pid, "access denied, skipping");
                    continue;
                }
                Err(ProcessTableError::Vanished { .. }) => continue,
                Err(err) => {
                    debug!(pid = %pid, error = %err, "could not inspect process, skipping");
                    continue;
                }
            };

            for connection in &record.connections {
                // A record may lack the port attribute; skip just that one.
                let Some(local_port) = connection.local_port else {
                    continue;
                };
                if local_port == port {
                    let cmdline = record.cmdline.join(" ");
                    let owner_line = format!(
                        "detected: process {pid} occupies port {port} (user: {user}, cmdline: {cmdline})",
                        user = record.user.as_deref().unwrap_or("unknown"),
                    );
                    debug!("{owner_line}");
                    let mut diagnostic = failure_text.to_string();
                    diagnostic.push(' ');
                    diagnostic.push_str(&owner_line);
                    return ConflictVerdict {
                        is_conflict: true,
                        owner_pid: Some(pid),
                        owner_user: record.user,
                        owner_cmdline: Some(cmdline),
                        diagnostic,
                    };
                }
            }
        }

        debug!(
            elapsed_ms = %started.elapsed().as_millis(),
            "process scan finished without finding the port owner"
        );
        ConflictVerdict {
            is_conflict: true,
            owner_pid: None,
            owner_user: None,
            owner_cmdline: None,
            diagnostic: failure_text.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use xferd_core::ports::{ConnectionRecord, ProcessRecord};

    /// Process table over synthetic records, with per-pid denial.
    struct FakeProcessTable {
        records: HashMap<u32, ProcessRecord>,
        denied: Vec<u32>,
    }

    impl FakeProcessTable {
        fn new(records: Vec<ProcessRecord>) -> Self {
            Self {
                records: records.into_iter().map(|r| (r.pid, r)).collect(),
                denied: Vec::new(),
            }
        }

        fn with_denied(mut self, pids: Vec<u32>) -> Self {
            self.denied = pids;
            self
        }
    }

    impl ProcessTablePort for FakeProcessTable {
        fn pids(&self) -> Vec<u32> {
            let mut pids: Vec<u32> = self
                .records
                .keys()
                .copied()
                .chain(self.denied.iter().copied())
                .collect();
            pids.sort_unstable();
            pids
        }

        fn inspect(&self, pid: u32) -> Result<ProcessRecord, ProcessTableError> {
            if self.denied.contains(&pid) {
                return Err(ProcessTableError::AccessDenied { pid });
            }
            self.records
                .get(&pid)
                .cloned()
                .ok_or(ProcessTableError::Vanished { pid })
        }
    }

    fn record(pid: u32, ports: Vec<Option<u16>>) -> ProcessRecord {
        ProcessRecord {
            pid,
            user: Some("daemon".to_string()),
            cmdline: vec!["recv-server".to_string(), "-p".to_string(), "5001".to_string()],
            connections: ports
                .into_iter()
                .map(|local_port| ConnectionRecord { local_port })
                .collect(),
        }
    }

    #[test]
    fn unrelated_failure_is_not_a_conflict() {
        let table = FakeProcessTable::new(vec![record(42, vec![Some(5001)])]);
        let diagnoser = ConflictDiagnoser::new(Arc::new(table));
        let verdict = diagnoser.diagnose(5001, "exited with code 1");
        assert!(!verdict.is_conflict);
        assert_eq!(verdict.owner_pid, None);
        assert_eq!(verdict.diagnostic, "exited with code 1");
    }

    #[test]
    fn matching_process_is_attributed() {
        let table = FakeProcessTable::new(vec![
            record(10, vec![Some(80)]),
            record(42, vec![Some(5001)]),
        ]);
        let diagnoser = ConflictDiagnoser::new(Arc::new(table));
        let verdict = diagnoser.diagnose(5001, "bind: Address already in use");
        assert!(verdict.is_conflict);
        assert_eq!(verdict.owner_pid, Some(42));
        assert_eq!(verdict.owner_user.as_deref(), Some("daemon"));
        assert!(verdict.diagnostic.contains("process 42 occupies port 5001"));
        assert!(verdict.diagnostic.contains("Address already in use"));
    }

    #[test]
    fn no_owner_found_still_reports_conflict() {
        let table = FakeProcessTable::new(vec![record(10, vec![Some(80)])]);
        let diagnoser = ConflictDiagnoser::new(Arc::new(table));
        let verdict = diagnoser.diagnose(5001, "bind: Address already in use");
        assert!(verdict.is_conflict);
        assert_eq!(verdict.owner_pid, None);
        assert_eq!(verdict.diagnostic, "bind: Address already in use");
    }

    #[test]
    fn denied_processes_are_skipped() {
        let table = FakeProcessTable::new(vec![record(42, vec![Some(5001)])])
            .with_denied(vec![7, 9]);
        let diagnoser = ConflictDiagnoser::new(Arc::new(table));
        let verdict = diagnoser.diagnose(5001, "Address already in use");
        assert_eq!(verdict.owner_pid, Some(42));
    }

    #[test]
    fn connection_without_port_is_skipped_not_fatal() {
        let table = FakeProcessTable::new(vec![record(42, vec![None, Some(5001)])]);
        let diagnoser = ConflictDiagnoser::new(Arc::new(table));
        let verdict = diagnoser.diagnose(5001, "Address already in use");
        assert_eq!(verdict.owner_pid, Some(42));
    }
}
