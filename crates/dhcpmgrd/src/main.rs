//! dhcpmgrd - ISC DHCP Configuration Manager
//!
//! Entry point for the dhcpmgrd command.

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use bootsync_common::settings::DEFAULT_SETTINGS_PATH;
use bootsync_common::{install_registry, Inventory, ManagerContext, MemoryInventory, Settings};
use bootsync_dhcpmgrd::default_registry;

/// Generates dhcpd configuration from the provisioning inventory
#[derive(Parser, Debug)]
#[command(name = "dhcpmgrd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings file
    #[arg(short = 'c', long, default_value = DEFAULT_SETTINGS_PATH, global = true)]
    config: PathBuf,

    /// Inventory snapshot (overrides the settings file)
    #[arg(short = 'i', long, global = true)]
    inventory: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug)]
struct RunArgs {
    /// Manager to run; repeat for several. Defaults to the settings list.
    #[arg(short = 'm', long = "manager")]
    managers: Vec<String>,

    /// Write addresses filled in by ip_sync back to the inventory file
    #[arg(long)]
    save_inventory: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write configuration, then restart services
    Sync(RunArgs),
    /// Write configuration only
    Write(RunArgs),
    /// Restart services only
    Restart(RunArgs),
}

impl Command {
    fn run_args(&self) -> &RunArgs {
        match self {
            Command::Sync(a) | Command::Write(a) | Command::Restart(a) => a,
        }
    }
}

/// Initializes tracing/logging subsystem
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("dhcpmgrd: failed to set tracing subscriber: {}", e);
    }
}

async fn run(args: Args) -> anyhow::Result<i32> {
    let settings = Settings::load_or_default(&args.config)
        .with_context(|| format!("loading settings from {}", args.config.display()))?;
    settings.validate()?;

    let inventory_path = args
        .inventory
        .clone()
        .unwrap_or_else(|| settings.paths.inventory.clone());
    let inventory = Arc::new(
        MemoryInventory::load(&inventory_path, settings.server.next_server.clone())
            .with_context(|| format!("loading inventory from {}", inventory_path.display()))?,
    );

    let run_args = args.command.run_args();
    let managers = if run_args.managers.is_empty() {
        settings.service.managers.clone()
    } else {
        run_args.managers.clone()
    };

    let shared: Arc<dyn Inventory> = inventory.clone();
    let ctx = ManagerContext::new(shared, Arc::new(settings));
    let registry = install_registry(default_registry(ctx)?)?;

    let mut status = 0;
    for name in &managers {
        let manager = registry.get(name)?;
        info!(manager = %name, command = ?args.command, "Running manager");
        let result = match &args.command {
            Command::Sync(_) => manager.sync().await,
            Command::Write(_) => manager.write_configs().await.map(|()| 0),
            Command::Restart(_) => Ok(manager.restart_service().await),
        };
        status |= result.map_err(|e| {
            error!(manager = %name, retryable = e.is_retryable(), "Manager failed: {}", e);
            e
        })?;
    }

    if run_args.save_inventory {
        inventory.save(&inventory_path)?;
    }

    Ok(status)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    info!("--- Starting dhcpmgrd ---");

    match run(args).await {
        Ok(0) => ExitCode::SUCCESS,
        Ok(status) => {
            error!(status, "dhcpmgrd finished with failures");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("dhcpmgrd failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
