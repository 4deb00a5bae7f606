//! Remote access layer for Caldera resource provisioning.
//!
//! This crate provides the `RemoteApi` capability for invoking named
//! operations on a remote control-plane API, its HTTP implementation, a
//! scripted in-memory mock for tests, endpoint configuration, delivery of
//! outcome documents to the controller's callback URL, and dispatch of
//! continuation requests to the external delay workflow.

pub mod callback;
pub mod config;
pub mod http;
pub mod mock;
pub mod waiter;

pub use callback::{CallbackDocument, STATUS_FAILED, STATUS_SUCCESS};
pub use config::ApiConfig;
pub use http::HttpApi;
pub use mock::{Invocation, MockApi};
pub use waiter::Waiter;

use caldera_schema::Args;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("remote I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("remote API error {code}: {message}")]
    Api { code: String, message: String },
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("remote config error: {0}")]
    Config(String),
    #[error("malformed response from {operation}: {detail}")]
    MalformedResponse { operation: String, detail: String },
}

/// Capability for invoking named operations on a remote control-plane API.
///
/// One implementation per transport. The client context is constructed once
/// and injected wherever operations are dispatched; there is no process-wide
/// session, so importing this crate has no side effects and tests swap in
/// [`MockApi`].
pub trait RemoteApi: Send + Sync {
    /// Invoke `operation` on `service` with already-coerced arguments and
    /// return the decoded response document.
    ///
    /// A response designating "no such resource" maps to
    /// [`ApiError::NotFound`]; structured remote failures map to
    /// [`ApiError::Api`].
    fn invoke(&self, service: &str, operation: &str, args: &Args) -> Result<Value, ApiError>;
}
