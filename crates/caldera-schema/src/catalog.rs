use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse catalog: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("failed to parse schema document: {0}")]
    ParseJson(#[from] serde_json::Error),
    #[error("unsupported catalog_version: {0}, expected 1")]
    UnsupportedVersion(u32),
    #[error("resource '{0}': service must not be empty")]
    EmptyService(String),
    #[error("resource '{resource}': {role} operation name must not be empty")]
    EmptyOperationName { resource: String, role: String },
    #[error("resource '{resource}': {role} operation '{operation}' requires physical_id_argument")]
    MissingIdArgument {
        resource: String,
        role: String,
        operation: String,
    },
    #[error("resource '{resource}': create operation '{operation}' requires physical_id_query")]
    MissingIdQuery { resource: String, operation: String },
}

/// One remote operation bound to a lifecycle role, with the metadata needed
/// to feed it a physical id and pull results back out of its response.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct OperationDecl {
    /// Operation name on the remote service, e.g. `create_cluster`.
    pub name: String,
    /// Argument that receives the physical id (read/update/delete operations).
    #[serde(default)]
    pub physical_id_argument: Option<String>,
    /// Dotted path into the response yielding the new physical id (create).
    #[serde(default)]
    pub physical_id_query: Option<String>,
    /// Dotted path into the response yielding reported attribute data.
    #[serde(default)]
    pub attributes_query: Option<String>,
}

/// Readiness polling predicate evaluated against the read operation's response.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ReadinessProbe {
    /// Dotted path to the observed state value.
    pub query: String,
    /// Observed value meaning the resource is ready.
    pub expected_value: String,
    /// Observed values meaning provisioning failed terminally.
    #[serde(default)]
    pub failed_values: Vec<String>,
}

/// Declarative lifecycle table for one resource type.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ResourceDecl {
    /// Remote service the operations belong to, e.g. `kafka`.
    pub service: String,
    pub create: OperationDecl,
    #[serde(default)]
    pub update: Vec<OperationDecl>,
    pub read: OperationDecl,
    pub delete: OperationDecl,
    #[serde(default)]
    pub readiness: Option<ReadinessProbe>,
    /// Error code the remote API reports when the resource does not exist.
    #[serde(default)]
    pub not_found_error: Option<String>,
    /// Permissions required beyond those derived from the bound operations.
    #[serde(default)]
    pub extra_permissions: Vec<String>,
}

/// Parsed resource catalog: resource type name → lifecycle table.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CatalogV1 {
    pub catalog_version: u32,
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceDecl>,
}

impl CatalogV1 {
    /// Validate structural invariants that TOML parsing alone cannot enforce.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.catalog_version != 1 {
            return Err(SchemaError::UnsupportedVersion(self.catalog_version));
        }
        for (name, decl) in &self.resources {
            decl.validate(name)?;
        }
        Ok(())
    }
}

impl ResourceDecl {
    fn validate(&self, resource: &str) -> Result<(), SchemaError> {
        if self.service.trim().is_empty() {
            return Err(SchemaError::EmptyService(resource.to_owned()));
        }
        check_named(resource, "create", &self.create)?;
        check_named(resource, "read", &self.read)?;
        check_named(resource, "delete", &self.delete)?;
        for op in &self.update {
            check_named(resource, "update", op)?;
        }

        if self.create.physical_id_query.is_none() {
            return Err(SchemaError::MissingIdQuery {
                resource: resource.to_owned(),
                operation: self.create.name.clone(),
            });
        }
        check_id_argument(resource, "read", &self.read)?;
        check_id_argument(resource, "delete", &self.delete)?;
        for op in &self.update {
            check_id_argument(resource, "update", op)?;
        }
        Ok(())
    }
}

fn check_named(resource: &str, role: &str, op: &OperationDecl) -> Result<(), SchemaError> {
    if op.name.trim().is_empty() {
        return Err(SchemaError::EmptyOperationName {
            resource: resource.to_owned(),
            role: role.to_owned(),
        });
    }
    Ok(())
}

fn check_id_argument(resource: &str, role: &str, op: &OperationDecl) -> Result<(), SchemaError> {
    if op.physical_id_argument.is_none() {
        return Err(SchemaError::MissingIdArgument {
            resource: resource.to_owned(),
            role: role.to_owned(),
            operation: op.name.clone(),
        });
    }
    Ok(())
}

/// Derive the permission identifier for one operation: the service name plus
/// the operation name in PascalCase, e.g. `("kafka", "create_cluster")` →
/// `"kafka:CreateCluster"`.
pub fn operation_permission(service: &str, operation: &str) -> String {
    let pascal: String = operation
        .split('_')
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect();
    format!("{service}:{pascal}")
}

pub fn parse_catalog_str(input: &str) -> Result<CatalogV1, SchemaError> {
    let catalog: CatalogV1 = toml::from_str(input)?;
    catalog.validate()?;
    Ok(catalog)
}

pub fn parse_catalog_file(path: impl AsRef<Path>) -> Result<CatalogV1, SchemaError> {
    let content = fs::read_to_string(path)?;
    parse_catalog_str(&content)
}
