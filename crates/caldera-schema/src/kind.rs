use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Argument schema of one remote operation: argument name → declared kind.
pub type StructSchema = BTreeMap<String, ArgKind>;

/// Recursively-typed kind declared for one argument of a remote operation.
///
/// Unit kinds serialize as plain strings (`"integer"`, `"boolean"`,
/// `"string"`); containers carry their nested schema, so a schema document
/// reads naturally in JSON or TOML:
///
/// ```json
/// {
///   "ClusterName": "string",
///   "NumberOfBrokerNodes": "integer",
///   "BrokerNodeGroupInfo": { "structure": { "BrokerAZDistribution": "string" } },
///   "ClientSubnets": { "list": "string" }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ArgKind {
    Integer,
    Boolean,
    String,
    Structure(StructSchema),
    List(Box<ArgKind>),
}

impl ArgKind {
    /// Short name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Structure(_) => "structure",
            Self::List(_) => "list",
        }
    }
}
