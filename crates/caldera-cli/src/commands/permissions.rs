use super::{json_pretty, load_schemas, EXIT_SUCCESS};
use caldera_core::ResourcePlan;
use caldera_schema::parse_catalog_file;
use std::collections::BTreeSet;
use std::path::Path;

pub fn run(catalog_path: &Path, schemas_path: Option<&Path>, json: bool) -> Result<u8, String> {
    let catalog = parse_catalog_file(catalog_path).map_err(|e| format!("catalog error: {e}"))?;
    let schemas = load_schemas(schemas_path)?;

    let mut all = BTreeSet::new();
    for (name, decl) in catalog.resources {
        let plan = ResourcePlan::build(decl, &schemas).map_err(|e| format!("catalog error: {name}: {e}"))?;
        all.extend(plan.permissions());
    }
    let permissions: Vec<String> = all.into_iter().collect();

    if json {
        println!("{}", json_pretty(&permissions)?);
    } else if permissions.is_empty() {
        println!("no resources registered");
    } else {
        for permission in &permissions {
            println!("{permission}");
        }
    }
    Ok(EXIT_SUCCESS)
}
