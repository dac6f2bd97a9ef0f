//! Process runtime and OS-level concerns for xferd.
//!
//! This crate implements the provisioning core over real OS primitives:
//! the provisioning action state machine, the port-conflict diagnoser
//! with its process-table inspector, command template rendering, the
//! pre-flight destination probe, and a `tokio::process`-backed launcher.

#![deny(unsafe_code)]

pub mod action;
mod command;
pub mod conflict;
mod host;
pub mod launcher;
mod ports;
mod preflight;
pub mod proctable;

// Re-export the main action and its state machine
pub use action::{ProvisioningAction, ProvisioningState};

// Re-export the conflict diagnosis types
pub use conflict::{ADDRESS_IN_USE, ConflictDiagnoser, ConflictVerdict};

// Re-export command template helpers for request-time validation
pub use command::{render_command, validate_template};

// Re-export the local launcher implementation
pub use launcher::{LocalLauncher, LocalLauncherFactory};

// Re-export port allocation utilities
pub use ports::{EphemeralPortCaller, free_port, is_port_available};

// Re-export the pre-flight probe and host name helpers
pub use host::host_name;
pub use preflight::probe_dest_files;

// Re-export the real process table
pub use proctable::SystemProcessTable;
