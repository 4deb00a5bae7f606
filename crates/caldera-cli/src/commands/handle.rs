use super::{colorize_status, json_pretty, load_schemas, spin_fail, spin_ok, spinner, EXIT_SUCCESS};
use caldera_core::{callback_document, Catalog, Disposition, Engine, ProvisioningRequest};
use caldera_remote::{callback, ApiConfig, HttpApi, RemoteApi, Waiter};
use caldera_schema::parse_catalog_file;
use serde_json::json;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

#[allow(clippy::too_many_arguments)]
pub fn run(
    catalog_path: &Path,
    schemas_path: Option<&Path>,
    api_url: Option<&str>,
    request_path: &Path,
    no_callback: bool,
    deployment: Option<&str>,
    json: bool,
) -> Result<u8, String> {
    let raw = read_request(request_path)?;
    let request: ProvisioningRequest = serde_json::from_str(&raw)
        .map_err(|e| format!("failed to parse request document: {e}"))?;

    let config = match api_url {
        Some(url) => ApiConfig::new(url),
        None => ApiConfig::load_default().map_err(|e| e.to_string())?,
    };
    let api: Arc<dyn RemoteApi> = Arc::new(HttpApi::new(config));

    let schemas = load_schemas(schemas_path)?;
    let catalog_file = parse_catalog_file(catalog_path).map_err(|e| format!("catalog error: {e}"))?;
    let catalog = Catalog::new(catalog_file, Arc::clone(&api), Arc::new(schemas))
        .map_err(|e| e.to_string())?;
    let engine = Engine::new(catalog);

    let pb = spinner("processing request…");
    let disposition = engine.handle(&request);
    spin_ok(&pb, "request processed");

    match disposition {
        Disposition::Done(outcome) => {
            if !no_callback {
                let pb = spinner("delivering callback…");
                let document = callback_document(&request, &outcome);
                if let Err(e) = callback::deliver(&request.response_url, &document) {
                    spin_fail(&pb, "callback delivery failed");
                    return Err(e.to_string());
                }
                spin_ok(&pb, "callback delivered");
            }
            if json {
                let payload = json!({
                    "disposition": "done",
                    "status": outcome.status,
                    "physical_id": outcome.physical_id,
                    "data": outcome.data,
                    "reason": outcome.reason,
                });
                println!("{}", json_pretty(&payload)?);
            } else {
                println!("{}  {}", colorize_status(&outcome.status.to_string()), outcome.physical_id);
                if let Some(reason) = &outcome.reason {
                    println!("reason: {reason}");
                }
            }
        }
        Disposition::Suspended(next) => {
            if !no_callback {
                let waiter = match deployment {
                    Some(deployment) => Waiter::new(Arc::clone(&api), deployment),
                    None => Waiter::from_env(Arc::clone(&api)).map_err(|e| e.to_string())?,
                };
                let pb = spinner("scheduling continuation…");
                let input = serde_json::to_value(&next)
                    .map_err(|e| format!("failed to serialize continuation: {e}"))?;
                if let Err(e) = waiter.dispatch(&input) {
                    spin_fail(&pb, "continuation dispatch failed");
                    return Err(e.to_string());
                }
                spin_ok(&pb, "continuation scheduled");
            }
            if json {
                let payload = json!({
                    "disposition": "suspended",
                    "next_action": next.action,
                    "physical_id": next.physical_id,
                });
                println!("{}", json_pretty(&payload)?);
            } else {
                println!(
                    "{}  {} ({:?})",
                    colorize_status("SCHEDULED"),
                    next.physical_id.as_deref().unwrap_or("-"),
                    next.action
                );
            }
        }
    }
    Ok(EXIT_SUCCESS)
}

fn read_request(path: &Path) -> Result<String, String> {
    if path.as_os_str() == "-" {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .map_err(|e| format!("failed to read request from stdin: {e}"))?;
        Ok(raw)
    } else {
        std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read request {}: {e}", path.display()))
    }
}
