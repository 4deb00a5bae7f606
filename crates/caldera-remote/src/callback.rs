use crate::ApiError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

pub const STATUS_SUCCESS: &str = "SUCCESS";
pub const STATUS_FAILED: &str = "FAILED";

/// Outcome document PUT back to the controller's callback URL.
///
/// Field names are the controller's wire format; the correlation fields echo
/// the originating request unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallbackDocument {
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Reason")]
    pub reason: String,
    #[serde(rename = "PhysicalResourceId")]
    pub physical_resource_id: String,
    #[serde(rename = "StackId")]
    pub stack_id: String,
    #[serde(rename = "RequestId")]
    pub request_id: String,
    #[serde(rename = "LogicalResourceId")]
    pub logical_resource_id: String,
    #[serde(rename = "NoEcho")]
    pub no_echo: bool,
    #[serde(rename = "Data")]
    pub data: Value,
}

/// Deliver the outcome document to the controller's callback URL.
///
/// Delivery happens exactly once: a failed PUT is reported to the caller
/// for logging but never retried, since the controller treats the callback
/// URL as single-use.
pub fn deliver(url: &str, document: &CallbackDocument) -> Result<(), ApiError> {
    let body = serde_json::to_vec(document).map_err(|e| ApiError::Serialization(e.to_string()))?;
    debug!("PUT {url} ({} bytes)", body.len());
    ureq::put(url)
        .header("Content-Type", "application/json")
        .send(&body[..])
        .map_err(|e| ApiError::Http(e.to_string()))?;
    info!(
        "reported {} for {} to the controller",
        document.status, document.logical_resource_id
    );
    Ok(())
}
