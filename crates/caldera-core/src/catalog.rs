use crate::adapter::TableAdapter;
use crate::lifecycle::ResourceLifecycle;
use crate::CoreError;
use caldera_remote::RemoteApi;
use caldera_schema::{operation_permission, CatalogV1, ResourceDecl, SchemaProvider};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

/// Factory producing a fresh custom lifecycle per request.
pub type CustomFactory =
    Arc<dyn Fn(Arc<dyn RemoteApi>) -> Box<dyn ResourceLifecycle> + Send + Sync>;

/// How a resource type's lifecycle is provided: driven by catalog metadata,
/// or by custom code for lifecycles a CRUD table cannot express.
pub enum Registration {
    Table(Box<ResourcePlan>),
    Custom(CustomFactory),
}

/// Catalog metadata for one table-driven resource, with the planner state
/// derived once at construction and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct ResourcePlan {
    pub decl: ResourceDecl,
    /// Properties only the create operation accepts: changing any of them
    /// forces replacement.
    pub replacement_required: BTreeSet<String>,
    /// Property name → index into `decl.update` of the operation that
    /// applies it.
    pub update_map: BTreeMap<String, usize>,
}

impl ResourcePlan {
    /// Derive the replacement set and the attribute→operation map from the
    /// operation schemas. A property accepted by two update operations is a
    /// configuration error; resolving it by registration order would make
    /// update routing depend on catalog file ordering.
    pub fn build(decl: ResourceDecl, schemas: &dyn SchemaProvider) -> Result<Self, CoreError> {
        let mut replacement_required: BTreeSet<String> = schemas
            .operation_schema(&decl.service, &decl.create.name)
            .map(|schema| schema.keys().cloned().collect())
            .unwrap_or_default();

        let mut update_map: BTreeMap<String, usize> = BTreeMap::new();
        for (index, op) in decl.update.iter().enumerate() {
            let Some(schema) = schemas.operation_schema(&decl.service, &op.name) else {
                debug!("no schema for {}.{}, skipping in update map", decl.service, op.name);
                continue;
            };
            for attribute in schema.keys() {
                if Some(attribute.as_str()) == op.physical_id_argument.as_deref() {
                    continue;
                }
                replacement_required.remove(attribute);
                if let Some(&existing) = update_map.get(attribute) {
                    return Err(CoreError::AmbiguousAttribute {
                        attribute: attribute.clone(),
                        first: decl.update[existing].name.clone(),
                        second: op.name.clone(),
                    });
                }
                update_map.insert(attribute.clone(), index);
            }
        }

        Ok(Self {
            decl,
            replacement_required,
            update_map,
        })
    }

    /// Permissions for every bound operation plus the declared extras.
    pub fn permissions(&self) -> Vec<String> {
        let decl = &self.decl;
        let mut permissions: Vec<String> = [&decl.create, &decl.read, &decl.delete]
            .into_iter()
            .chain(decl.update.iter())
            .map(|op| operation_permission(&decl.service, &op.name))
            .collect();
        permissions.extend(decl.extra_permissions.iter().cloned());
        permissions
    }
}

/// Immutable registry of every resource type the engine can provision.
///
/// Holds the injected control-plane client and schema provider and hands a
/// fresh adapter to the engine for each request. Construction validates the
/// whole catalog up front so a bad registration fails deployment rather
/// than its first request.
pub struct Catalog {
    api: Arc<dyn RemoteApi>,
    schemas: Arc<dyn SchemaProvider>,
    resources: BTreeMap<String, Registration>,
}

impl Catalog {
    pub fn new(
        catalog: CatalogV1,
        api: Arc<dyn RemoteApi>,
        schemas: Arc<dyn SchemaProvider>,
    ) -> Result<Self, CoreError> {
        catalog.validate()?;
        let mut resources = BTreeMap::new();
        for (name, decl) in catalog.resources {
            let plan = ResourcePlan::build(decl, schemas.as_ref())?;
            debug!(
                "registered {name}: {} replacement-required, {} updatable attributes",
                plan.replacement_required.len(),
                plan.update_map.len()
            );
            resources.insert(name, Registration::Table(Box::new(plan)));
        }
        Ok(Self {
            api,
            schemas,
            resources,
        })
    }

    /// Register a resource type whose lifecycle is implemented in code.
    /// Replaces any previous registration under the same name.
    pub fn register_custom(&mut self, resource_type: impl Into<String>, factory: CustomFactory) {
        self.resources
            .insert(resource_type.into(), Registration::Custom(factory));
    }

    pub fn contains(&self, resource_type: &str) -> bool {
        self.resources.contains_key(resource_type)
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    /// Construct a fresh lifecycle adapter for one request.
    pub fn adapter(&self, resource_type: &str) -> Option<Box<dyn ResourceLifecycle>> {
        match self.resources.get(resource_type)? {
            Registration::Table(plan) => Some(Box::new(TableAdapter::new(
                plan.as_ref().clone(),
                Arc::clone(&self.api),
                Arc::clone(&self.schemas),
            ))),
            Registration::Custom(factory) => Some(factory(Arc::clone(&self.api))),
        }
    }

    /// Flat, sorted, deduplicated permission manifest across every
    /// registered resource type, the input for least-privilege policy on the
    /// engine's own execution identity.
    pub fn required_permissions(&self) -> Vec<String> {
        let mut all = BTreeSet::new();
        for registration in self.resources.values() {
            match registration {
                Registration::Table(plan) => all.extend(plan.permissions()),
                Registration::Custom(factory) => {
                    all.extend(factory(Arc::clone(&self.api)).required_permissions());
                }
            }
        }
        all.into_iter().collect()
    }
}
