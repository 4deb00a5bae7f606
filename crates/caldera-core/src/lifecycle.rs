use crate::CoreError;
use caldera_schema::Args;
use serde_json::Value;
use std::collections::BTreeSet;

/// Result of a successful create call.
#[derive(Debug, Clone, PartialEq)]
pub struct Created {
    /// Remote-assigned identifier of the new instance.
    pub physical_id: String,
    /// Attribute data from the create response; `Null` when the operation
    /// reports none.
    pub attributes: Value,
}

/// Capability interface of one resource type's lifecycle.
///
/// The engine drives every request through this interface. The generic
/// [`TableAdapter`](crate::adapter::TableAdapter) implements all of it from
/// catalog metadata; resource types whose lifecycle cannot be expressed as a
/// CRUD table register a custom implementation instead. Adapters are
/// constructed fresh per request and may cache remote reads across the
/// methods of a single invocation (`&mut self`), but never across requests.
pub trait ResourceLifecycle {
    /// Whether the resource identified by `physical_id` currently exists.
    /// A designated "not found" failure from the remote API is `false`,
    /// not an error.
    fn exists(&mut self, physical_id: &str) -> Result<bool, CoreError>;

    /// Whether the resource is ready for use. `true` when no readiness
    /// predicate applies. A terminal remote state is an error, not `false`.
    fn ready(&mut self, physical_id: &str) -> Result<bool, CoreError>;

    /// Attribute data to report once ready; may rely on caching from a
    /// preceding `exists`/`ready` call within the same invocation.
    fn data(&mut self) -> Value;

    /// Create a new instance from the (already service-token-stripped)
    /// desired properties.
    fn create(&mut self, args: &Args) -> Result<Created, CoreError>;

    /// Whether the changed properties can be applied in place, or force a
    /// replacement.
    fn can_update(&self, old: &Args, new: &Args, diff: &BTreeSet<String>) -> bool;

    /// Apply an in-place update; returns the attribute data to report.
    fn update(
        &mut self,
        physical_id: &str,
        old: &Args,
        new: &Args,
        diff: &BTreeSet<String>,
    ) -> Result<Value, CoreError>;

    /// Start deletion of the resource. Completion is checked by the engine
    /// through `exists`.
    fn delete(&mut self, physical_id: &str) -> Result<(), CoreError>;

    /// Permissions this lifecycle needs against the remote API, as
    /// `"service:Operation"` strings.
    fn required_permissions(&self) -> Vec<String>;
}
