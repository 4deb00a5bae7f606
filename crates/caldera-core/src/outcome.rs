use crate::request::ProvisioningRequest;
use caldera_remote::CallbackDocument;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Terminal status reported to the controller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Success,
    Failed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("SUCCESS"),
            Self::Failed => f.write_str("FAILED"),
        }
    }
}

/// Terminal result of one provisioning request.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Outcome {
    pub status: Status,
    pub physical_id: String,
    /// Attribute data reported back to the controller; `Null` when there is
    /// nothing to report.
    pub data: Value,
    /// Human-readable explanation, always present on failure.
    pub reason: Option<String>,
}

impl Outcome {
    pub fn success(physical_id: impl Into<String>, data: Value) -> Self {
        Self {
            status: Status::Success,
            physical_id: physical_id.into(),
            data,
            reason: None,
        }
    }

    pub fn failed(physical_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            status: Status::Failed,
            physical_id: physical_id.into(),
            data: Value::Null,
            reason: Some(reason.into()),
        }
    }
}

/// Build the controller response document for a terminal outcome: the
/// outcome's fields plus the originating request's correlation fields,
/// echoed unchanged.
pub fn callback_document(request: &ProvisioningRequest, outcome: &Outcome) -> CallbackDocument {
    CallbackDocument {
        status: outcome.status.to_string(),
        reason: outcome
            .reason
            .clone()
            .unwrap_or_else(|| format!("See the engine log for request {}", request.request_id)),
        physical_resource_id: outcome.physical_id.clone(),
        stack_id: request.stack_id.clone(),
        request_id: request.request_id.clone(),
        logical_resource_id: request.logical_resource_id.clone(),
        no_echo: false,
        data: if outcome.data.is_null() {
            Value::Object(Map::new())
        } else {
            outcome.data.clone()
        },
    }
}

/// What the engine decided for one request; exactly one per invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    /// Terminal: report the outcome to the controller.
    Done(Outcome),
    /// Still in progress: hand the rewritten request to the delay workflow
    /// for a later re-delivery.
    Suspended(ProvisioningRequest),
}
