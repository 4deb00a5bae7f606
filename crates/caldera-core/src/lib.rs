//! Core lifecycle engine for Caldera custom-resource provisioning.
//!
//! This crate ties together catalog metadata, operation schemas, and the
//! remote control-plane client into the `Engine`, the request/response state
//! machine that drives create, update, delete, and continuation-wait requests
//! to exactly one disposition each. It also provides the property diff
//! planner, the `ResourceLifecycle` capability interface, and the generic
//! table-driven adapter that implements a full resource lifecycle from
//! catalog metadata alone.

pub mod adapter;
pub mod catalog;
pub mod diff;
pub mod engine;
pub mod lifecycle;
pub mod outcome;
pub mod request;

pub use adapter::TableAdapter;
pub use catalog::{Catalog, CustomFactory, Registration, ResourcePlan};
pub use diff::diff_properties;
pub use engine::Engine;
pub use lifecycle::{Created, ResourceLifecycle};
pub use outcome::{callback_document, Disposition, Outcome, Status};
pub use request::{Action, ProvisioningRequest, NEVER_CREATED, SERVICE_TOKEN_KEY};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("catalog error: {0}")]
    Schema(#[from] caldera_schema::SchemaError),
    #[error("remote API error: {0}")]
    Api(#[from] caldera_remote::ApiError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("unknown resource type: {0}")]
    UnknownResourceType(String),
    #[error("invalid request type")]
    UnknownAction,
    #[error("invalid attribute: {0}")]
    InvalidAttribute(String),
    #[error("unable to find any update operation to execute")]
    NoUpdateOperation,
    #[error("create response of '{operation}' has no physical id at '{query}'")]
    MissingPhysicalId { operation: String, query: String },
    #[error("invalid resource state {0}")]
    ResourceFailed(String),
    #[error("update operations '{first}' and '{second}' both accept attribute '{attribute}'")]
    AmbiguousAttribute {
        attribute: String,
        first: String,
        second: String,
    },
}
