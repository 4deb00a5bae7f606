mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_CATALOG_ERROR, EXIT_FAILURE, EXIT_REQUEST_ERROR};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "caldera",
    version,
    about = "Custom-resource provisioning engine for remote control planes"
)]
struct Cli {
    /// Path to the resource catalog TOML file.
    #[arg(long, default_value = "catalog.toml", global = true)]
    catalog: PathBuf,

    /// Path to the operation schema JSON document.
    #[arg(long, global = true)]
    schemas: Option<PathBuf>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Process one provisioning request document.
    Handle {
        /// Path to the request JSON document ("-" for stdin).
        request: PathBuf,
        /// Remote control-plane base URL (overrides the config file).
        #[arg(long)]
        api_url: Option<String>,
        /// Print the disposition instead of delivering the callback or
        /// scheduling the continuation.
        #[arg(long, default_value_t = false)]
        no_callback: bool,
        /// Deployment identifier scoping the delay-workflow lookup
        /// (default: $CALDERA_DEPLOYMENT).
        #[arg(long)]
        deployment: Option<String>,
    },
    /// Print the aggregated least-privilege permission manifest.
    Permissions,
    /// Validate the resource catalog against the operation schemas.
    Validate,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("CALDERA_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let json_output = cli.json;
    let result = match cli.command {
        Commands::Handle {
            request,
            api_url,
            no_callback,
            deployment,
        } => commands::handle::run(
            &cli.catalog,
            cli.schemas.as_deref(),
            api_url.as_deref(),
            &request,
            no_callback,
            deployment.as_deref(),
            json_output,
        ),
        Commands::Permissions => {
            commands::permissions::run(&cli.catalog, cli.schemas.as_deref(), json_output)
        }
        Commands::Validate => {
            commands::validate::run(&cli.catalog, cli.schemas.as_deref(), json_output)
        }
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("catalog error:")
                || msg.starts_with("failed to parse catalog")
                || msg.starts_with("failed to read catalog")
                || msg.starts_with("failed to parse schema document")
            {
                EXIT_CATALOG_ERROR
            } else if msg.starts_with("failed to parse request")
                || msg.starts_with("failed to read request")
            {
                EXIT_REQUEST_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}
