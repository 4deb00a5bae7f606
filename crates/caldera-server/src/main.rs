use caldera_core::{Catalog, Engine};
use caldera_remote::{ApiConfig, HttpApi, RemoteApi, Waiter};
use caldera_schema::{parse_catalog_file, StaticSchemaProvider};
use caldera_server::EventHandler;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "caldera-server", about = "Caldera provisioning event endpoint")]
struct Cli {
    /// Port to listen on.
    #[arg(long, default_value_t = 8411)]
    port: u16,

    /// Path to the resource catalog TOML file.
    #[arg(long, default_value = "catalog.toml")]
    catalog: PathBuf,

    /// Path to the operation schema JSON document.
    #[arg(long)]
    schemas: Option<PathBuf>,

    /// Remote control-plane base URL (overrides the config file).
    #[arg(long)]
    api_url: Option<String>,

    /// Deployment identifier scoping the delay-workflow lookup
    /// (default: $CALDERA_DEPLOYMENT).
    #[arg(long)]
    deployment: Option<String>,
}

fn build_handler(cli: &Cli) -> Result<EventHandler, String> {
    let config = match &cli.api_url {
        Some(url) => ApiConfig::new(url),
        None => ApiConfig::load_default().map_err(|e| e.to_string())?,
    };
    let api: Arc<dyn RemoteApi> = Arc::new(HttpApi::new(config));

    let schemas = match &cli.schemas {
        Some(path) => StaticSchemaProvider::from_json_file(path).map_err(|e| e.to_string())?,
        None => StaticSchemaProvider::new(),
    };

    let catalog_file = parse_catalog_file(&cli.catalog).map_err(|e| e.to_string())?;
    let catalog = Catalog::new(catalog_file, Arc::clone(&api), Arc::new(schemas))
        .map_err(|e| e.to_string())?;
    info!(
        "catalog loaded: {} resource types, {} permissions",
        catalog.resource_types().count(),
        catalog.required_permissions().len()
    );

    let waiter = match &cli.deployment {
        Some(deployment) => Waiter::new(Arc::clone(&api), deployment.clone()),
        None => Waiter::from_env(Arc::clone(&api)).map_err(|e| e.to_string())?,
    };

    Ok(EventHandler::new(Engine::new(catalog), waiter))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("CALDERA_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let handler = match build_handler(&cli) {
        Ok(handler) => Arc::new(handler),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let addr = format!("0.0.0.0:{}", cli.port);
    info!("starting caldera-server on {addr}");
    caldera_server::run_server(&handler, &addr);
}
