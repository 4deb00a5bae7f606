pub mod completions;
pub mod handle;
pub mod man_pages;
pub mod permissions;
pub mod validate;

use caldera_schema::StaticSchemaProvider;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CATALOG_ERROR: u8 = 2;
pub const EXIT_REQUEST_ERROR: u8 = 3;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn colorize_status(status: &str) -> String {
    use console::Style;
    match status {
        "SUCCESS" => Style::new().green().apply_to(status).to_string(),
        "FAILED" => Style::new().red().bold().apply_to(status).to_string(),
        "SCHEDULED" => Style::new().cyan().apply_to(status).to_string(),
        other => other.to_owned(),
    }
}

/// Load the operation schema document, or an empty provider when none is
/// configured.
pub fn load_schemas(path: Option<&Path>) -> Result<StaticSchemaProvider, String> {
    match path {
        Some(path) => StaticSchemaProvider::from_json_file(path).map_err(|e| e.to_string()),
        None => Ok(StaticSchemaProvider::new()),
    }
}
