//! Core domain types and port definitions for xferd.
//!
//! This crate holds the pure domain model of the transfer-provisioning
//! daemon: the request and result records exchanged with remote callers,
//! the provisioning error kinds, and the port (trait) abstractions the
//! runtime implements. It contains no process or filesystem code.

#![deny(unused_crate_dependencies)]

pub mod error;
pub mod ports;
pub mod request;
pub mod result;

// Re-export commonly used types for convenience
pub use error::ProvisionError;
pub use ports::{
    CallerPort, ConfigPort, ConnectionRecord, LaunchFailure, LaunchSpec, LauncherFactoryPort,
    LauncherPort, MapConfig, MetricsSinkPort, NoopMetricsSink, PortAllocationError, ProcessRecord,
    ProcessTableError, ProcessTablePort,
};
pub use request::TransferRequest;
pub use result::{STATUS_FAILED, STATUS_PENDING, STATUS_SUCCESS, TransferResult};

// Silence unused dev-dependency warnings until we add mock-based tests
#[cfg(test)]
use mockall as _;
#[cfg(test)]
use tokio_test as _;
