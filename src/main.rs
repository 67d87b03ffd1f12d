use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use netscaler_lbaas::collector::StatusCollector;
use netscaler_lbaas::config::{DriverConfig, Overrides};
use netscaler_lbaas::driver::PendingVips;
use netscaler_lbaas::ncc::{NccClient, RemoteClient};
use netscaler_lbaas::network::StaticNetworkInfo;
use netscaler_lbaas::store::MemoryStore;
use netscaler_lbaas::Error;
use tokio::sync::watch;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the driver: status collector plus REST API
    Run(RunArgs),
    /// Show version and build information
    Version,
    /// Validate the configuration and print the effective settings
    CheckConfig(ConfigArgs),
}

#[derive(Parser, Debug)]
struct ConfigArgs {
    /// Path to the driver config file
    #[arg(long, env = "NCC_DRIVER_CONFIG")]
    config: Option<PathBuf>,

    /// Control Center base URI
    #[arg(long, env = "NCC_URI")]
    ncc_uri: Option<String>,

    /// Control Center user name
    #[arg(long, env = "NCC_USERNAME")]
    ncc_username: Option<String>,

    /// Control Center password
    #[arg(long, env = "NCC_PASSWORD", hide_env_values = true)]
    ncc_password: Option<String>,
}

impl ConfigArgs {
    fn load(&self) -> Result<DriverConfig, Error> {
        DriverConfig::load(
            self.config.as_deref(),
            Overrides {
                ncc_uri: self.ncc_uri.clone(),
                ncc_username: self.ncc_username.clone(),
                ncc_password: self.ncc_password.clone(),
            },
        )
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
struct RunArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Address the REST API listens on
    #[cfg(feature = "rest-api")]
    #[arg(long, env = "NCC_DRIVER_LISTEN", default_value = "0.0.0.0:8080")]
    listen: std::net::SocketAddr,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();

    match args.command {
        Commands::Version => {
            println!("NetScaler LBaaS driver v{}", env!("CARGO_PKG_VERSION"));
            println!("Build Date: {}", env!("BUILD_DATE"));
            println!("Git SHA: {}", env!("GIT_SHA"));
            println!("Rust Version: {}", env!("RUST_VERSION"));
            Ok(())
        }
        Commands::CheckConfig(config_args) => check_config(config_args),
        Commands::Run(run_args) => run_driver(run_args).await,
    }
}

fn init_tracing(format: LogFormat) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Text => registry.with(fmt::layer().with_target(true)).init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(true))
            .init(),
    }
}

fn check_config(args: ConfigArgs) -> Result<(), Error> {
    let config = args.load()?;
    NccClient::new(config.ncc.clone())?;

    println!("{config}");
    println!("Configuration OK");
    Ok(())
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = ctrl_c() => info!("Received SIGINT"),
                _ = sigterm.recv() => info!("Received SIGTERM"),
            }
        }
        Err(e) => {
            warn!("Failed to install SIGTERM handler: {}", e);
            ctrl_c().await;
            info!("Received SIGINT");
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    ctrl_c().await;
    info!("Received SIGINT");
}

async fn run_driver(args: RunArgs) -> Result<(), Error> {
    init_tracing(args.log_format);

    info!(
        "Starting NetScaler LBaaS driver v{}",
        env!("CARGO_PKG_VERSION")
    );

    let config = args.config.load()?;
    let client: Arc<dyn RemoteClient> = Arc::new(NccClient::new(config.ncc.clone())?);
    info!("Using NetScaler Control Center at {}", config.ncc.uri);

    let store = Arc::new(MemoryStore::new());
    let networks = Arc::new(StaticNetworkInfo::new(&config.networks));
    let pending = PendingVips::new();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let collector = StatusCollector::new(
        client.clone(),
        store.clone(),
        pending.clone(),
        config.collector.clone(),
    )
    .spawn(shutdown_rx);

    #[cfg(feature = "rest-api")]
    {
        use netscaler_lbaas::driver::Driver;
        use netscaler_lbaas::rest_api::{self, ApiState};

        let driver = Driver::new(client, store.clone(), networks, pending);
        let state = Arc::new(ApiState::new(driver, store));
        rest_api::run_server(state, args.listen, shutdown_signal()).await?;
    }

    #[cfg(not(feature = "rest-api"))]
    {
        drop((client, networks, pending));
        shutdown_signal().await;
    }

    let _ = shutdown_tx.send(true);
    if let Err(e) = collector.await {
        warn!("Status collector task failed: {}", e);
    }

    info!("Driver stopped");
    Ok(())
}
