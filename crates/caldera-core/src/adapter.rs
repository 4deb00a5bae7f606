use crate::catalog::ResourcePlan;
use crate::lifecycle::{Created, ResourceLifecycle};
use crate::CoreError;
use caldera_remote::{ApiError, RemoteApi};
use caldera_schema::{coerce_args, select, select_string, Args, OperationDecl, SchemaProvider};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Generic remote-call adapter: a complete resource lifecycle driven by
/// catalog metadata alone, with no resource-specific code.
///
/// Every outgoing call coerces its arguments against the target operation's
/// schema first. Attribute data observed by `exists`/`ready` is cached so a
/// later `data()` in the same invocation reports it.
pub struct TableAdapter {
    plan: ResourcePlan,
    api: Arc<dyn RemoteApi>,
    schemas: Arc<dyn SchemaProvider>,
    cached_data: Value,
}

impl TableAdapter {
    pub(crate) fn new(
        plan: ResourcePlan,
        api: Arc<dyn RemoteApi>,
        schemas: Arc<dyn SchemaProvider>,
    ) -> Self {
        Self {
            plan,
            api,
            schemas,
            cached_data: Value::Null,
        }
    }

    fn invoke(&self, op: &OperationDecl, args: &Args) -> Result<Value, CoreError> {
        let service = &self.plan.decl.service;
        let coerced = match self.schemas.operation_schema(service, &op.name) {
            Some(schema) => coerce_args(args, schema),
            None => args.clone(),
        };
        debug!("calling {service}.{}", op.name);
        Ok(self.api.invoke(service, &op.name, &coerced)?)
    }

    fn id_args(op: &OperationDecl, physical_id: &str) -> Args {
        let mut args = Args::new();
        if let Some(ref argument) = op.physical_id_argument {
            args.insert(argument.clone(), Value::String(physical_id.to_owned()));
        }
        args
    }

    /// Invoke the read operation and cache its extracted attributes.
    fn read(&mut self, physical_id: &str) -> Result<Value, CoreError> {
        let read = self.plan.decl.read.clone();
        let response = self.invoke(&read, &Self::id_args(&read, physical_id))?;
        if let Some(ref query) = read.attributes_query {
            if let Some(attributes) = select(&response, query) {
                self.cached_data = attributes.clone();
            }
        }
        Ok(response)
    }

    fn is_not_found(&self, err: &CoreError) -> bool {
        match err {
            CoreError::Api(ApiError::NotFound(_)) => true,
            CoreError::Api(ApiError::Api { code, .. }) => {
                Some(code.as_str()) == self.plan.decl.not_found_error.as_deref()
            }
            _ => false,
        }
    }
}

impl ResourceLifecycle for TableAdapter {
    fn exists(&mut self, physical_id: &str) -> Result<bool, CoreError> {
        match self.read(physical_id) {
            Ok(_) => Ok(true),
            Err(err) if self.is_not_found(&err) => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn ready(&mut self, physical_id: &str) -> Result<bool, CoreError> {
        let Some(probe) = self.plan.decl.readiness.clone() else {
            return Ok(true);
        };
        let response = self.read(physical_id)?;
        let observed = select_string(&response, &probe.query).unwrap_or_default();
        debug!("resource state is {observed}");
        if observed == probe.expected_value {
            return Ok(true);
        }
        if probe.failed_values.contains(&observed) {
            return Err(CoreError::ResourceFailed(observed));
        }
        Ok(false)
    }

    fn data(&mut self) -> Value {
        self.cached_data.clone()
    }

    fn create(&mut self, args: &Args) -> Result<Created, CoreError> {
        let create = &self.plan.decl.create;
        let response = self.invoke(create, args)?;
        let query = create.physical_id_query.as_deref().unwrap_or_default();
        let physical_id =
            select_string(&response, query).ok_or_else(|| CoreError::MissingPhysicalId {
                operation: create.name.clone(),
                query: query.to_owned(),
            })?;
        let attributes = create
            .attributes_query
            .as_deref()
            .and_then(|q| select(&response, q).cloned())
            .unwrap_or(Value::Null);
        info!("created instance {physical_id} via {}", create.name);
        Ok(Created {
            physical_id,
            attributes,
        })
    }

    fn can_update(&self, _old: &Args, _new: &Args, diff: &BTreeSet<String>) -> bool {
        diff.iter()
            .all(|attribute| !self.plan.replacement_required.contains(attribute))
    }

    fn update(
        &mut self,
        physical_id: &str,
        _old: &Args,
        new: &Args,
        diff: &BTreeSet<String>,
    ) -> Result<Value, CoreError> {
        // Group the changed attributes by the operation that applies them.
        let mut grouped: BTreeMap<usize, Args> = BTreeMap::new();
        for attribute in diff {
            let Some(&index) = self.plan.update_map.get(attribute) else {
                return Err(CoreError::InvalidAttribute(attribute.clone()));
            };
            let op = &self.plan.decl.update[index];
            let args = grouped.entry(index).or_default();
            if let Some(ref argument) = op.physical_id_argument {
                args.insert(argument.clone(), Value::String(physical_id.to_owned()));
            }
            // A removed attribute resets with an empty value; omitting it
            // would leave the server-side value in place.
            let value = new
                .get(attribute)
                .cloned()
                .unwrap_or_else(|| Value::String(String::new()));
            args.insert(attribute.clone(), value);
        }
        if grouped.is_empty() {
            return Err(CoreError::NoUpdateOperation);
        }

        let mut data = Value::Null;
        for (index, args) in &grouped {
            let op = &self.plan.decl.update[*index];
            let response = self.invoke(op, args)?;
            if let Some(ref query) = op.attributes_query {
                data = select(&response, query).cloned().unwrap_or(Value::Null);
            }
        }
        Ok(data)
    }

    fn delete(&mut self, physical_id: &str) -> Result<(), CoreError> {
        let delete = &self.plan.decl.delete;
        self.invoke(delete, &Self::id_args(delete, physical_id))?;
        info!("requested deletion of {physical_id} via {}", delete.name);
        Ok(())
    }

    fn required_permissions(&self) -> Vec<String> {
        self.plan.permissions()
    }
}
