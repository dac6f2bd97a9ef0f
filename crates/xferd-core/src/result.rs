//! Result record returned to the remote caller.

use serde::{Deserialize, Serialize};

/// Status code of a successfully started receiving server.
pub const STATUS_SUCCESS: i32 = 0;
/// Status code of an action that has not completed yet.
pub const STATUS_PENDING: i32 = -1;
/// Status code of a failed launch.
pub const STATUS_FAILED: i32 = -2;

/// Outcome record of one provisioning action.
///
/// Immutable once constructed; the action returns it to the caller and
/// does not retain it. Pure packaging: no side effects, no collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    /// Transfer identifier this result belongs to.
    pub id: String,
    /// `STATUS_SUCCESS` or `STATUS_FAILED`.
    pub status: i32,
    /// Port the receiving server listens on (set on success).
    pub server_port: Option<u16>,
    /// Human-readable outcome message.
    pub msg: String,
    /// Captured process output.
    pub log: String,
}

impl TransferResult {
    /// Package a successful launch.
    #[must_use]
    pub fn success(id: impl Into<String>, server_port: u16, log: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: STATUS_SUCCESS,
            server_port: Some(server_port),
            msg: "receiving server is running".to_string(),
            log: log.into(),
        }
    }

    /// Package a failed launch.
    #[must_use]
    pub fn failure(id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: STATUS_FAILED,
            server_port: None,
            msg: msg.into(),
            log: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_carries_port_and_log() {
        let result = TransferResult::success("T1", 5001, "ok");
        assert_eq!(result.status, STATUS_SUCCESS);
        assert_eq!(result.server_port, Some(5001));
        assert_eq!(result.log, "ok");
        assert_eq!(result.msg, "receiving server is running");
    }

    #[test]
    fn failure_has_failure_sentinel_and_no_port() {
        let result = TransferResult::failure("T1", "could not start");
        assert_eq!(result.status, STATUS_FAILED);
        assert_eq!(result.server_port, None);
    }

    #[test]
    fn serializes_stably() {
        let result = TransferResult::success("T1", 5001, "ok");
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(
            json,
            r#"{"id":"T1","status":0,"server_port":5001,"msg":"receiving server is running","log":"ok"}"#
        );
        let back: TransferResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }
}
