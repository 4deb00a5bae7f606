use crate::{ApiError, RemoteApi};
use caldera_schema::{select_string, Args};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Logical name under which the delay workflow is registered with the
/// controller deployment.
pub const WAITER_LOGICAL_NAME: &str = "Waiter";

/// Environment variable carrying the deployment identifier that scopes the
/// workflow lookup.
pub const DEPLOYMENT_ENV: &str = "CALDERA_DEPLOYMENT";

const ORCHESTRATOR_SERVICE: &str = "orchestrator";
const DESCRIBE_RESOURCE_OP: &str = "describe_stack_resource";
const WORKFLOW_SERVICE: &str = "workflows";
const START_EXECUTION_OP: &str = "start_execution";

/// Dispatches continuation requests to the external fixed-delay workflow.
///
/// A suspended request is made durable by handing it to a delay workflow
/// that re-delivers it after a pause; the workflow's identity is resolved
/// through the controller by its well-known logical name, scoped to this
/// deployment. Repeated suspensions simply dispatch again; the total wait
/// is bounded only by the controller's own operation timeout.
pub struct Waiter {
    api: Arc<dyn RemoteApi>,
    deployment: String,
}

impl Waiter {
    pub fn new(api: Arc<dyn RemoteApi>, deployment: impl Into<String>) -> Self {
        Self {
            api,
            deployment: deployment.into(),
        }
    }

    /// Build a waiter scoped by the `CALDERA_DEPLOYMENT` environment variable.
    pub fn from_env(api: Arc<dyn RemoteApi>) -> Result<Self, ApiError> {
        let deployment = std::env::var(DEPLOYMENT_ENV)
            .map_err(|_| ApiError::Config(format!("{DEPLOYMENT_ENV} not set")))?;
        Ok(Self::new(api, deployment))
    }

    /// Start one execution of the delay workflow with `request` as its input.
    pub fn dispatch(&self, request: &Value) -> Result<(), ApiError> {
        let mut query = Args::new();
        query.insert("StackName".to_owned(), Value::String(self.deployment.clone()));
        query.insert(
            "LogicalResourceId".to_owned(),
            Value::String(WAITER_LOGICAL_NAME.to_owned()),
        );
        let described = self
            .api
            .invoke(ORCHESTRATOR_SERVICE, DESCRIBE_RESOURCE_OP, &query)?;
        let workflow_id = select_string(&described, "StackResourceDetail.PhysicalResourceId")
            .ok_or_else(|| ApiError::MalformedResponse {
                operation: format!("{ORCHESTRATOR_SERVICE}.{DESCRIBE_RESOURCE_OP}"),
                detail: "missing StackResourceDetail.PhysicalResourceId".to_owned(),
            })?;
        debug!("delay workflow for deployment {} is {workflow_id}", self.deployment);

        let input =
            serde_json::to_string(request).map_err(|e| ApiError::Serialization(e.to_string()))?;
        let mut start = Args::new();
        start.insert("WorkflowId".to_owned(), Value::String(workflow_id.clone()));
        start.insert("Input".to_owned(), Value::String(input));
        self.api
            .invoke(WORKFLOW_SERVICE, START_EXECUTION_OP, &start)?;
        info!("scheduled continuation through workflow {workflow_id}");
        Ok(())
    }
}
