use anyhow::Result;
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use regkit::runtime::{run, RunOptions, ShutdownOptions};
use regkit::{DiscoverySettings, InMemoryRegistry, ListenerHandle, SystemAddressResolver};
use regkit_bootstrap::{AppConfig, AppConfigProvider, CliArgs, ConfigProvider};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

mod http;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Adapter to make `AppConfigProvider` implement `regkit::ConfigurationSource`.
///
/// An empty `application.name` falls back to this binary's package name.
struct RegkitConfigAdapter(Arc<AppConfigProvider>);

impl regkit::ConfigurationSource for RegkitConfigAdapter {
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value> {
        self.0.get_module_config(module_name)
    }

    fn application_name(&self) -> &str {
        match self.0.application_name() {
            "" => env!("CARGO_PKG_NAME"),
            name => name,
        }
    }
}

/// RegKit Server - announces itself to a discovery registry while it serves
#[derive(Parser)]
#[command(name = "regkit-server")]
#[command(about = "RegKit Server - announces itself to a discovery registry while it serves")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port override for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Validate configuration and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
    };

    // Layered config:
    // 1) defaults -> 2) YAML (if provided) -> 3) env (APP__*) -> 4) CLI overrides
    // Also normalizes + creates server.home_dir.
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config.logging.as_ref().cloned().unwrap_or_default();
    regkit_bootstrap::logging::init_logging_unified(
        &logging_config,
        Path::new(&config.server.home_dir),
    );

    tracing::info!("RegKit Server starting");

    if args.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(config),
    }
}

async fn run_server(config: AppConfig) -> Result<()> {
    let stop_timeout =
        (config.server.timeout_sec > 0).then(|| Duration::from_secs(config.server.timeout_sec));
    let host = config.server.host.clone();
    let port = config.server.port;

    let config_source = Arc::new(RegkitConfigAdapter(Arc::new(AppConfigProvider::new(config))));

    // The bundled registry lives in this process; `/instances` shows its content.
    let registry = Arc::new(InMemoryRegistry::new());
    let handle = ListenerHandle::new();
    let listener = Arc::new(http::HttpListener::new(
        host,
        port,
        registry.clone(),
        handle.clone(),
    ));

    let run_options = RunOptions {
        config: config_source,
        registry,
        address: Arc::new(SystemAddressResolver::new()),
        shutdown: ShutdownOptions::Signals,
        web_server: Arc::new(handle),
        stop_timeout,
    };

    run(run_options, listener).await
}

fn check_config(config: AppConfig) -> Result<()> {
    tracing::info!("Checking configuration…");
    let source = RegkitConfigAdapter(Arc::new(AppConfigProvider::new(config.clone())));
    let settings = DiscoverySettings::from_source(&source)?;
    println!("Configuration is valid");
    println!(
        "auto_register: {}, service: {}",
        settings.enabled(),
        settings.effective_service_name()
    );
    println!("{}", config.to_yaml()?);
    Ok(())
}
