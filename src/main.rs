//! CLI entry point for robolink.
//!
//! ```bash
//! robolink resources --json
//! robolink --address 10.1.1.20:8080 watch --check-every 2s
//! robolink stop-all
//! robolink version
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use robolink::config::{RobolinkConfig, DEFAULT_CONFIG_PATH};
use robolink::logging;
use robolink_client::{
    friendly_error_message, resolve_address, ClientError, ClientOptions, PollInterval,
    RobotClient,
};
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "robolink")]
#[command(about = "Connect to a remote robot and inspect its resources", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Robot address (host:port or URL); overrides the configuration file
    #[arg(long, global = true)]
    address: Option<String>,

    /// Log level; overrides the configuration file
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the robot's resources
    Resources {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Stay connected and report connection changes until Ctrl-C
    Watch {
        /// Liveness probe interval (e.g. 1s, once, never)
        #[arg(long)]
        check_every: Option<PollInterval>,

        /// Reconnect attempt interval
        #[arg(long)]
        reconnect_every: Option<PollInterval>,

        /// Resource refresh interval
        #[arg(long)]
        refresh_every: Option<PollInterval>,
    },

    /// Stop every actuator on the robot
    StopAll,

    /// Print the robot's software version
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = RobolinkConfig::load_from(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    if let Some(level) = &cli.log_level {
        config.application.log_level = level.clone();
    }
    config.validate().map_err(anyhow::Error::msg)?;
    logging::init_from_config(&config).map_err(anyhow::Error::msg)?;

    let address = resolve_address(cli.address.as_deref(), config.client.address.as_deref());
    debug!(address = %address, source = address.source().label(), "Resolved robot address");

    match cli.command {
        Commands::Resources { json } => {
            let client = connect(&config, address, config.client.options.clone()).await?;
            let result = list_resources(&client, json);
            client.close().await;
            result
        }
        Commands::Watch {
            check_every,
            reconnect_every,
            refresh_every,
        } => {
            let mut options = config.client.options.clone();
            if let Some(interval) = check_every {
                options = options.with_check_connected_every(interval);
            }
            if let Some(interval) = reconnect_every {
                options = options.with_reconnect_every(interval);
            }
            if let Some(interval) = refresh_every {
                options = options.with_refresh_every(interval);
            }
            let client = connect(&config, address, options).await?;
            let result = watch(&client).await;
            client.close().await;
            result
        }
        Commands::StopAll => {
            let client = connect(&config, address, config.client.options.clone()).await?;
            let result = client.stop_all().await.map_err(friendly);
            client.close().await;
            result?;
            println!("All actuators stopped");
            Ok(())
        }
        Commands::Version => {
            let client = connect(&config, address, config.client.options.clone()).await?;
            let result = client.version().await.map_err(friendly);
            client.close().await;
            println!("{}", result?);
            Ok(())
        }
    }
}

async fn connect(
    config: &RobolinkConfig,
    address: robolink_client::RobotAddress,
    options: ClientOptions,
) -> Result<RobotClient> {
    info!(app = %config.application.name, address = %address, "Connecting");
    RobotClient::connect(address, options)
        .await
        .map_err(friendly)
}

fn list_resources(client: &RobotClient, json: bool) -> Result<()> {
    let names = client.resource_names();
    if json {
        println!("{}", serde_json::to_string_pretty(&names)?);
        return Ok(());
    }
    if names.is_empty() {
        println!("Robot reports no resources");
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}

async fn watch(client: &RobotClient) -> Result<()> {
    let mut changes = client.changed();
    println!(
        "{} ({} resources); press Ctrl-C to stop",
        client.state(),
        client.resource_names().len()
    );

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                return Ok(());
            }
            changed = changes.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let connected = *changes.borrow_and_update();
                if connected {
                    println!("connected ({} resources)", client.resource_names().len());
                } else {
                    println!("disconnected");
                }
            }
        }
    }
}

/// Attach a user-facing hint to a client error.
fn friendly(error: ClientError) -> anyhow::Error {
    let hint = friendly_error_message(&error);
    anyhow::Error::new(error).context(hint)
}
