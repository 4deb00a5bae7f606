use caldera_schema::Args;
use serde::{Deserialize, Serialize};

/// Physical id recorded when Create never produced one, so a later Delete
/// can report success without touching the remote API.
pub const NEVER_CREATED: &str = "RESOURCE-NEVER-CREATED";

/// Reserved property carrying the engine's own address. Stripped before the
/// properties are treated as domain arguments.
pub const SERVICE_TOKEN_KEY: &str = "ServiceToken";

/// Requested lifecycle action. `WaitReady` and `WaitDelete` are the
/// engine-issued continuation actions; the controller only ever sends the
/// first three.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Action {
    Create,
    Update,
    Delete,
    /// Continue waiting for a created resource to become ready.
    WaitReady,
    /// Continue waiting for a deletion to finish.
    WaitDelete,
    #[serde(other)]
    Unknown,
}

/// One unit of work delivered by the controller (or re-delivered by the
/// delay workflow). Field names follow the controller's wire format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProvisioningRequest {
    #[serde(rename = "RequestType")]
    pub action: Action,
    #[serde(rename = "ResourceType")]
    pub resource_type: String,
    #[serde(rename = "ResourceProperties", default)]
    pub properties: Args,
    #[serde(rename = "OldResourceProperties", default, skip_serializing_if = "Option::is_none")]
    pub old_properties: Option<Args>,
    #[serde(rename = "PhysicalResourceId", default, skip_serializing_if = "Option::is_none")]
    pub physical_id: Option<String>,
    #[serde(rename = "StackId", default)]
    pub stack_id: String,
    #[serde(rename = "RequestId", default)]
    pub request_id: String,
    #[serde(rename = "LogicalResourceId", default)]
    pub logical_resource_id: String,
    #[serde(rename = "ResponseURL", default)]
    pub response_url: String,
}

impl ProvisioningRequest {
    /// The request's physical id, substituting the never-created sentinel
    /// when the controller sent none.
    pub fn physical_id_or_sentinel(&self) -> &str {
        self.physical_id.as_deref().unwrap_or(NEVER_CREATED)
    }

    /// Desired properties with the reserved service-token key removed.
    pub fn domain_properties(&self) -> Args {
        clean_properties(&self.properties)
    }

    /// Prior properties with the reserved service-token key removed; empty
    /// for non-Update requests.
    pub fn old_domain_properties(&self) -> Args {
        self.old_properties
            .as_ref()
            .map(clean_properties)
            .unwrap_or_default()
    }

    /// Rewrite this request into a continuation: same work item, new action,
    /// physical id fixed to the value obtained so far.
    pub fn continuation(&self, action: Action, physical_id: &str) -> Self {
        let mut next = self.clone();
        next.action = action;
        next.physical_id = Some(physical_id.to_owned());
        next
    }
}

fn clean_properties(properties: &Args) -> Args {
    let mut cleaned = properties.clone();
    cleaned.remove(SERVICE_TOKEN_KEY);
    cleaned
}
