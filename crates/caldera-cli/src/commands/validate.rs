use super::{json_pretty, load_schemas, EXIT_SUCCESS};
use caldera_core::ResourcePlan;
use caldera_schema::{parse_catalog_file, OperationDecl, ResourceDecl, SchemaProvider};
use serde_json::json;
use std::path::Path;

pub fn run(catalog_path: &Path, schemas_path: Option<&Path>, json: bool) -> Result<u8, String> {
    let catalog = parse_catalog_file(catalog_path).map_err(|e| format!("catalog error: {e}"))?;
    let schemas = load_schemas(schemas_path)?;

    let mut reports = Vec::new();
    for (name, decl) in catalog.resources {
        let missing = missing_schemas(&decl, &schemas);
        let plan = ResourcePlan::build(decl, &schemas).map_err(|e| format!("catalog error: {name}: {e}"))?;
        reports.push((name, plan, missing));
    }

    if json {
        let payload: Vec<_> = reports
            .iter()
            .map(|(name, plan, missing)| {
                json!({
                    "resource_type": name,
                    "service": plan.decl.service,
                    "updatable_attributes": plan.update_map.keys().collect::<Vec<_>>(),
                    "replacement_required": plan.replacement_required,
                    "missing_schemas": missing,
                })
            })
            .collect();
        println!("{}", json_pretty(&payload)?);
    } else if reports.is_empty() {
        println!("catalog is valid (no resources registered)");
    } else {
        println!("catalog is valid: {} resource type(s)", reports.len());
        for (name, plan, missing) in &reports {
            println!(
                "  {name}: service {}, {} updatable, {} replacement-required",
                plan.decl.service,
                plan.update_map.len(),
                plan.replacement_required.len()
            );
            for operation in missing {
                println!("    warning: no schema for {operation}");
            }
        }
    }
    Ok(EXIT_SUCCESS)
}

/// Operations declared in the catalog but absent from the schema document.
fn missing_schemas(decl: &ResourceDecl, schemas: &dyn SchemaProvider) -> Vec<String> {
    let operations: Vec<&OperationDecl> = [&decl.create, &decl.read, &decl.delete]
        .into_iter()
        .chain(decl.update.iter())
        .collect();
    operations
        .into_iter()
        .filter(|op| schemas.operation_schema(&decl.service, &op.name).is_none())
        .map(|op| format!("{}.{}", decl.service, op.name))
        .collect()
}
