use crate::catalog::Catalog;
use crate::diff::diff_properties;
use crate::lifecycle::ResourceLifecycle;
use crate::outcome::{Disposition, Outcome};
use crate::request::{Action, ProvisioningRequest, NEVER_CREATED};
use crate::CoreError;
use serde_json::Value;
use tracing::{debug, error, info, warn};

/// The lifecycle engine: drives one provisioning request to exactly one
/// disposition: a terminal outcome for the controller, or a suspension for
/// the delay workflow.
///
/// All state is reconstructed per request from the catalog and live remote
/// queries; nothing is carried between invocations. Any error raised while
/// handling is caught here and reported as a failed outcome, so the
/// controller always receives an answer.
pub struct Engine {
    catalog: Catalog,
}

impl Engine {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Handle one request. Never panics and never produces more or less
    /// than one disposition.
    pub fn handle(&self, request: &ProvisioningRequest) -> Disposition {
        info!(
            "handling {:?} for {} ({})",
            request.action, request.logical_resource_id, request.resource_type
        );
        match self.try_handle(request) {
            Ok(disposition) => disposition,
            Err(err) => {
                error!("request {} failed: {err}", request.request_id);
                Disposition::Done(Outcome::failed(
                    request.physical_id_or_sentinel(),
                    err.to_string(),
                ))
            }
        }
    }

    fn try_handle(&self, request: &ProvisioningRequest) -> Result<Disposition, CoreError> {
        let Some(mut adapter) = self.catalog.adapter(&request.resource_type) else {
            if request.action == Action::Delete
                && request.physical_id_or_sentinel() == NEVER_CREATED
            {
                // The controller must always be able to clean up a resource
                // that never came into being, even under a bad type name.
                return Ok(done_success(NEVER_CREATED, Value::Null));
            }
            return Err(CoreError::UnknownResourceType(request.resource_type.clone()));
        };
        let adapter = adapter.as_mut();

        match request.action {
            Action::Create => self.create(adapter, request),
            Action::Update => self.update(adapter, request),
            Action::Delete => self.delete(adapter, request),
            Action::WaitReady => Self::wait_ready(adapter, request),
            Action::WaitDelete => Self::wait_delete(adapter, request),
            Action::Unknown => Err(CoreError::UnknownAction),
        }
    }

    fn create(
        &self,
        adapter: &mut dyn ResourceLifecycle,
        request: &ProvisioningRequest,
    ) -> Result<Disposition, CoreError> {
        let args = request.domain_properties();
        let created = adapter.create(&args)?;
        if adapter.ready(&created.physical_id)? {
            Ok(done_success(&created.physical_id, created.attributes))
        } else {
            info!("resource {} not ready yet, waiting", created.physical_id);
            Ok(Disposition::Suspended(
                request.continuation(Action::WaitReady, &created.physical_id),
            ))
        }
    }

    fn update(
        &self,
        adapter: &mut dyn ResourceLifecycle,
        request: &ProvisioningRequest,
    ) -> Result<Disposition, CoreError> {
        let physical_id = request.physical_id_or_sentinel();
        if !resource_exists(adapter, physical_id)? {
            warn!("resource {physical_id} no longer exists, recreating");
            return self.create(adapter, request);
        }

        let old = request.old_domain_properties();
        let new = request.domain_properties();
        let diff = diff_properties(&old, &new);
        debug!("changed attributes: {diff:?}");

        if !adapter.can_update(&old, &new, &diff) {
            info!("changed attributes cannot be applied in place, recreating");
            return self.create(adapter, request);
        }

        let data = adapter.update(physical_id, &old, &new, &diff)?;
        Ok(done_success(physical_id, data))
    }

    fn delete(
        &self,
        adapter: &mut dyn ResourceLifecycle,
        request: &ProvisioningRequest,
    ) -> Result<Disposition, CoreError> {
        let physical_id = request.physical_id_or_sentinel();
        if !resource_exists(adapter, physical_id)? {
            debug!("resource {physical_id} already gone, delete is a no-op");
            return Ok(done_success(physical_id, Value::Null));
        }

        adapter.delete(physical_id)?;
        if adapter.exists(physical_id)? {
            info!("deletion of {physical_id} still in progress, waiting");
            return Ok(Disposition::Suspended(
                request.continuation(Action::WaitDelete, physical_id),
            ));
        }
        Ok(done_success(physical_id, Value::Null))
    }

    fn wait_ready(
        adapter: &mut dyn ResourceLifecycle,
        request: &ProvisioningRequest,
    ) -> Result<Disposition, CoreError> {
        let physical_id = request.physical_id_or_sentinel();
        if adapter.ready(physical_id)? {
            let data = adapter.data();
            Ok(done_success(physical_id, data))
        } else {
            debug!("resource {physical_id} still not ready, waiting again");
            Ok(Disposition::Suspended(
                request.continuation(Action::WaitReady, physical_id),
            ))
        }
    }

    fn wait_delete(
        adapter: &mut dyn ResourceLifecycle,
        request: &ProvisioningRequest,
    ) -> Result<Disposition, CoreError> {
        let physical_id = request.physical_id_or_sentinel();
        if resource_exists(adapter, physical_id)? {
            debug!("resource {physical_id} still present, waiting again");
            Ok(Disposition::Suspended(
                request.continuation(Action::WaitDelete, physical_id),
            ))
        } else {
            Ok(done_success(physical_id, Value::Null))
        }
    }
}

/// Existence check with the sentinel short-circuit: a resource that was
/// never created cannot exist and must not cost a remote call.
fn resource_exists(
    adapter: &mut dyn ResourceLifecycle,
    physical_id: &str,
) -> Result<bool, CoreError> {
    if physical_id == NEVER_CREATED {
        debug!("physical id is the never-created sentinel");
        return Ok(false);
    }
    adapter.exists(physical_id)
}

fn done_success(physical_id: &str, data: Value) -> Disposition {
    Disposition::Done(Outcome::success(physical_id, data))
}
