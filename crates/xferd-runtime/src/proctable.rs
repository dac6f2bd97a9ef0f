//! Real process-table inspection.
//!
//! Process enumeration, owning user, and command line come from
//! `sysinfo`. Per-process network connections are read from `/proc` on
//! Linux: socket inodes in `/proc/<pid>/fd` are matched against the
//! `/proc/net/tcp` and `tcp6` tables. Other platforms report processes
//! with an empty connection list, so a conflict verdict degrades to
//! "owner unknown" rather than failing.

use std::sync::Mutex;
use sysinfo::{Pid, ProcessesToUpdate, System, Users};
use xferd_core::ports::{ConnectionRecord, ProcessRecord, ProcessTableError, ProcessTablePort};

/// Process table backed by the live OS state.
pub struct SystemProcessTable {
    system: Mutex<System>,
    users: Users,
}

impl SystemProcessTable {
    /// Create a process table inspector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
            users: Users::new_with_refreshed_list(),
        }
    }
}

impl Default for SystemProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTablePort for SystemProcessTable {
    fn pids(&self) -> Vec<u32> {
        let mut system = self.system.lock().unwrap();
        system.refresh_processes(ProcessesToUpdate::All, true);
        system.processes().keys().map(|pid| pid.as_u32()).collect()
    }

    fn inspect(&self, pid: u32) -> Result<ProcessRecord, ProcessTableError> {
        let mut system = self.system.lock().unwrap();
        if system.process(Pid::from_u32(pid)).is_none() {
            // Not in the last enumeration snapshot; try this pid directly.
            system.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]), false);
        }
        let process = system
            .process(Pid::from_u32(pid))
            .ok_or(ProcessTableError::Vanished { pid })?;

        let user = process
            .user_id()
            .and_then(|uid| self.users.get_user_by_id(uid))
            .map(|user| user.name().to_string());
        let cmdline = process
            .cmd()
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        let connections = local_connections(pid)?;

        Ok(ProcessRecord {
            pid,
            user,
            cmdline,
            connections,
        })
    }
}

#[cfg(target_os = "linux")]
fn local_connections(pid: u32) -> Result<Vec<ConnectionRecord>, ProcessTableError> {
    use std::fs;
    use std::io::ErrorKind;

    let inode_ports = socket_port_table();
    let fd_dir = format!("/proc/{pid}/fd");
    let entries = match fs::read_dir(&fd_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::PermissionDenied => {
            return Err(ProcessTableError::AccessDenied { pid });
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(ProcessTableError::Vanished { pid });
        }
        Err(err) => return Err(ProcessTableError::Unavailable(err.to_string())),
    };

    let mut connections = Vec::new();
    for entry in entries.flatten() {
        let Ok(target) = fs::read_link(entry.path()) else {
            // fd closed between listing and readlink
            continue;
        };
        let target = target.to_string_lossy();
        let Some(inode) = target
            .strip_prefix("socket:[")
            .and_then(|rest| rest.strip_suffix(']'))
            .and_then(|inode| inode.parse::<u64>().ok())
        else {
            continue;
        };
        connections.push(ConnectionRecord {
            local_port: inode_ports.get(&inode).copied(),
        });
    }
    Ok(connections)
}

/// Map socket inodes to local TCP ports from the kernel tables.
///
/// Lines that do not parse are dropped rather than failing the scan.
#[cfg(target_os = "linux")]
fn socket_port_table() -> std::collections::HashMap<u64, u16> {
    let mut map = std::collections::HashMap::new();
    for table in ["/proc/net/tcp", "/proc/net/tcp6"] {
        let Ok(text) = std::fs::read_to_string(table) else {
            continue;
        };
        for line in text.lines().skip(1) {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 10 {
                continue;
            }
            let Some(port_hex) = fields[1].rsplit(':').next() else {
                continue;
            };
            let Ok(port) = u16::from_str_radix(port_hex, 16) else {
                continue;
            };
            let Ok(inode) = fields[9].parse::<u64>() else {
                continue;
            };
            map.insert(inode, port);
        }
    }
    map
}

#[cfg(not(target_os = "linux"))]
fn local_connections(_pid: u32) -> Result<Vec<ConnectionRecord>, ProcessTableError> {
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enumeration_includes_current_process() {
        let table = SystemProcessTable::new();
        let self_pid = std::process::id();
        assert!(table.pids().contains(&self_pid));
    }

    #[test]
    fn inspect_current_process_succeeds() {
        let table = SystemProcessTable::new();
        let self_pid = std::process::id();
        table.pids();
        let record = table.inspect(self_pid).unwrap();
        assert_eq!(record.pid, self_pid);
        assert!(!record.cmdline.is_empty());
    }

    #[test]
    fn inspect_impossible_pid_reports_vanished() {
        let table = SystemProcessTable::new();
        table.pids();
        let err = table.inspect(u32::MAX - 1).unwrap_err();
        assert!(matches!(err, ProcessTableError::Vanished { .. }));
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn own_listening_socket_is_visible() {
        let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let port = listener.local_addr().unwrap().port();

        let table = SystemProcessTable::new();
        table.pids();
        let record = table.inspect(std::process::id()).unwrap();
        assert!(
            record
                .connections
                .iter()
                .any(|conn| conn.local_port == Some(port))
        );
    }
}
