//! Mock admin for testing (records disable requests instead of sending them).
//!
//! ```
//! use openrisk::AccountId;
//! use openrisk_admin::AccountAdmin;
//! use openrisk_admin::mock::RecordingAdmin;
//!
//! let admin = RecordingAdmin::new();
//! admin.disable_account(AccountId(3), "gross exposure");
//! assert_eq!(admin.count_for(AccountId(3)), 1);
//! ```

use std::sync::Mutex;

use openrisk::AccountId;
use serde_json::Value;

use crate::error::AdminError;
use crate::{AccountAdmin, AdminTransport, DisableRequest};

/// Records every disable request in call order.
#[derive(Debug, Default)]
pub struct RecordingAdmin {
    requests: Mutex<Vec<DisableRequest>>,
}

impl RecordingAdmin {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded requests (for assertion in tests).
    pub fn requests(&self) -> Vec<DisableRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// How many times `account` was disabled.
    pub fn count_for(&self, account: AccountId) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|r| r.account == account)
            .count()
    }

    pub fn clear(&self) {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl AccountAdmin for RecordingAdmin {
    fn disable_account(&self, account: AccountId, reason: &str) {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(DisableRequest::new(account, reason));
    }
}

/// How the mock transport answers.
#[derive(Clone, Debug)]
pub enum Reply {
    Ok,
    Reject(String),
    /// The wire failed mid-request.
    Transport(String),
    Disconnected,
}

/// Transport that records payloads and answers with a fixed [`Reply`].
#[derive(Debug)]
pub struct MockTransport {
    reply: Reply,
    sent: Mutex<Vec<Value>>,
}

impl MockTransport {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<Value> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl AdminTransport for MockTransport {
    fn send(&self, payload: &Value) -> Result<Value, AdminError> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(payload.clone());
        match &self.reply {
            Reply::Ok => Ok(Value::Bool(true)),
            Reply::Reject(msg) => Err(AdminError::Rejected(msg.clone())),
            Reply::Transport(msg) => Err(AdminError::Transport(msg.clone())),
            Reply::Disconnected => Err(AdminError::NotConnected),
        }
    }
}
