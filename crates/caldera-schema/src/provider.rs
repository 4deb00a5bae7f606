use crate::catalog::SchemaError;
use crate::kind::StructSchema;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Capability for obtaining the argument schema of a remote operation.
///
/// The engine never assumes how schemas are produced: they may be generated
/// at build time, shipped as a document next to the catalog, or queried from
/// the remote service model. A missing schema is legal: coercion then passes
/// arguments through unchanged and the planner treats the operation as
/// accepting no arguments.
pub trait SchemaProvider: Send + Sync {
    fn operation_schema(&self, service: &str, operation: &str) -> Option<&StructSchema>;
}

/// Schema provider backed by a fixed `"service.operation"` → schema table,
/// typically loaded from a JSON document produced at deploy time:
///
/// ```json
/// {
///   "kafka.create_cluster": {
///     "ClusterName": "string",
///     "NumberOfBrokerNodes": "integer"
///   }
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticSchemaProvider {
    schemas: BTreeMap<String, StructSchema>,
}

impl StaticSchemaProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, service: &str, operation: &str, schema: StructSchema) {
        self.schemas.insert(key(service, operation), schema);
    }

    #[must_use]
    pub fn with_schema(mut self, service: &str, operation: &str, schema: StructSchema) -> Self {
        self.insert(service, operation, schema);
        self
    }

    pub fn from_json_str(input: &str) -> Result<Self, SchemaError> {
        let schemas: BTreeMap<String, StructSchema> = serde_json::from_str(input)?;
        Ok(Self { schemas })
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl SchemaProvider for StaticSchemaProvider {
    fn operation_schema(&self, service: &str, operation: &str) -> Option<&StructSchema> {
        self.schemas.get(&key(service, operation))
    }
}

fn key(service: &str, operation: &str) -> String {
    format!("{service}.{operation}")
}
