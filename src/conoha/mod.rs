//! ConoHa (OpenStack) control-plane access.
//!
//! The controller talks to the control plane only through [`ComputeApi`], so the
//! HTTP client can be swapped for a scripted fake in tests.

mod client;

pub use client::ConohaClient;

use crate::error::TransportError;
use crate::model::{Credentials, ServerAction, ServerSnapshot};
use async_trait::async_trait;

#[async_trait]
pub trait ComputeApi: Send + Sync {
    /// Present credentials to the identity service.
    /// `Ok(None)` means the call succeeded but no `X-Subject-Token` header came back.
    async fn issue_token(&self, credentials: &Credentials)
        -> Result<Option<String>, TransportError>;

    async fn fetch_server(
        &self,
        token: &str,
        server_id: &str,
    ) -> Result<ServerSnapshot, TransportError>;

    async fn server_action(
        &self,
        token: &str,
        server_id: &str,
        action: ServerAction,
    ) -> Result<(), TransportError>;
}
