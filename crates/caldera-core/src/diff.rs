use caldera_schema::Args;
use std::collections::BTreeSet;

/// Compute the set of changed top-level property names between the prior and
/// desired property mappings: every name present in exactly one of the two,
/// plus every name present in both whose value differs structurally. Nested
/// changes surface only as a change of the top-level name they live under.
///
/// The result is ordered, so downstream grouping and remote-call execution
/// are deterministic.
pub fn diff_properties(old: &Args, new: &Args) -> BTreeSet<String> {
    let mut changed = BTreeSet::new();
    for (name, old_value) in old {
        match new.get(name) {
            Some(new_value) if new_value == old_value => {}
            _ => {
                changed.insert(name.clone());
            }
        }
    }
    for name in new.keys() {
        if !old.contains_key(name) {
            changed.insert(name.clone());
        }
    }
    changed
}
