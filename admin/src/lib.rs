//! Account administration for openrisk trade stops.
//!
//! The risk engine only knows the [`AccountAdmin`] trait: disabling an
//! account is fire-and-forget from its point of view. Implementations:
//!
//! - [`RpcAdmin`]: encodes the admin RPC payload and hands it to an
//!   [`AdminTransport`], logging failures
//! - [`DryRunAdmin`]: logs what would have been disabled
//! - [`mock::RecordingAdmin`]: records requests for assertions in tests

pub mod error;
pub mod mock;

pub use error::AdminError;

use log::{info, warn};
use openrisk::AccountId;
use serde::Serialize;

/// Disables trading on an account.
///
/// Called at most once per account per risk pass. Implementations must not
/// panic and should not block for long; retries belong here, not in the
/// engine.
pub trait AccountAdmin {
    fn disable_account(&self, account: AccountId, reason: &str);
}

impl<A: AccountAdmin + ?Sized> AccountAdmin for &A {
    fn disable_account(&self, account: AccountId, reason: &str) {
        (**self).disable_account(account, reason)
    }
}

impl<A: AccountAdmin + ?Sized> AccountAdmin for Box<A> {
    fn disable_account(&self, account: AccountId, reason: &str) {
        (**self).disable_account(account, reason)
    }
}

/// A single account-disable action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DisableRequest {
    pub account: AccountId,
    pub reason: String,
}

impl DisableRequest {
    pub fn new(account: AccountId, reason: impl Into<String>) -> Self {
        Self {
            account,
            reason: reason.into(),
        }
    }

    /// Admin RPC payload: `["admin", "sub accounts", "disable", account, reason]`.
    pub fn payload(&self) -> serde_json::Value {
        serde_json::json!(["admin", "sub accounts", "disable", self.account.0, self.reason])
    }
}

/// Wire to the administrative RPC endpoint.
pub trait AdminTransport {
    fn send(&self, payload: &serde_json::Value) -> Result<serde_json::Value, AdminError>;
}

/// [`AccountAdmin`] that sends disable requests over an [`AdminTransport`].
///
/// Transport failures are logged and dropped; the risk pass carries on.
#[derive(Debug)]
pub struct RpcAdmin<T> {
    transport: T,
}

impl<T: AdminTransport> RpcAdmin<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send one request and report the outcome instead of swallowing it.
    pub fn try_disable(&self, request: &DisableRequest) -> Result<serde_json::Value, AdminError> {
        self.transport.send(&request.payload())
    }
}

impl<T: AdminTransport> AccountAdmin for RpcAdmin<T> {
    fn disable_account(&self, account: AccountId, reason: &str) {
        let request = DisableRequest::new(account, reason);
        match self.try_disable(&request) {
            Ok(_) => info!("disabled account {account}: {reason}"),
            Err(e) => warn!("failed to disable account {account}: {e}"),
        }
    }
}

/// [`AccountAdmin`] that only logs.
#[derive(Clone, Copy, Debug, Default)]
pub struct DryRunAdmin;

impl AccountAdmin for DryRunAdmin {
    fn disable_account(&self, account: AccountId, reason: &str) {
        info!("[dry run] would disable account {account}: {reason}");
    }
}
