//! Operation metadata and argument schemas for Caldera resource provisioning.
//!
//! This crate defines the schema layer: the recursive argument kind model
//! (`ArgKind`), type-directed coercion of loosely-typed controller properties
//! into the types a remote operation declares, dotted-path extraction from
//! response documents, TOML resource catalog parsing (`CatalogV1`), and the
//! pluggable `SchemaProvider` capability for obtaining operation schemas.

pub mod catalog;
pub mod coerce;
pub mod kind;
pub mod provider;
pub mod select;

pub use catalog::{
    operation_permission, parse_catalog_file, parse_catalog_str, CatalogV1, OperationDecl,
    ReadinessProbe, ResourceDecl, SchemaError,
};
pub use coerce::{coerce_args, coerce_value, Args};
pub use kind::{ArgKind, StructSchema};
pub use provider::{SchemaProvider, StaticSchemaProvider};
pub use select::{select, select_string};
