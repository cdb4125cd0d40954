mod commands;
mod utils;

use clap::{Parser, Subcommand};
use skiff_cloud::CancellationToken;
use skiff_cloud_gce::{GceClient, GceProvider, StaticToken};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "skiff")]
#[command(about = "Short-lived GCE test hosts: image, disk, instance, firewall", long_about = None)]
struct Cli {
    /// Compute API endpoint (emulators, tests)
    #[arg(long, env = "SKIFF_GCE_API_BASE", global = true, hide = true)]
    api_base: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the newest public image for a platform
    Image {
        /// Platform token (e.g. centos-7-x86_64, debian-10-amd64)
        platform: String,
    },
    /// Manage persistent disks
    #[command(subcommand)]
    Disk(DiskCommands),
    /// Manage instances
    #[command(subcommand)]
    Instance(InstanceCommands),
    /// Manage firewall rules
    #[command(subcommand)]
    Firewall(FirewallCommands),
    /// Provision a host: image, disk, instance, metadata, firewall
    Up {
        /// Name shared by the disk, instance and firewall rule
        name: String,
        /// Platform token
        #[arg(short, long)]
        platform: String,
    },
    /// Tear down a host created by `up`
    Down {
        name: String,
    },
    /// Show version information
    Version,
}

#[derive(Subcommand)]
pub enum DiskCommands {
    /// Create a disk, optionally from the newest image of a platform
    Create {
        name: String,
        /// Platform whose image initializes the disk
        #[arg(short, long)]
        image: Option<String>,
    },
    /// Delete a disk (it must not be attached)
    Delete { name: String },
    /// List disks in the configured zone
    List,
}

#[derive(Subcommand)]
pub enum InstanceCommands {
    /// Create a boot disk from the platform image and an instance on it
    Create {
        name: String,
        #[arg(short, long)]
        platform: String,
    },
    /// Delete an instance (its disk is kept)
    Delete { name: String },
    /// List instances in the configured zone
    List,
}

#[derive(Subcommand)]
pub enum FirewallCommands {
    /// Open the configured TCP ports to instances tagged with NAME
    Create { name: String },
    Delete { name: String },
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let api_base = cli.api_base.as_deref();
    match cli.command {
        Commands::Version => println!("skiff {}", env!("CARGO_PKG_VERSION")),
        Commands::Image { platform } => {
            commands::image::handle(&connect(api_base)?, &platform).await?
        }
        Commands::Disk(cmd) => commands::disk::handle(&connect(api_base)?, cmd).await?,
        Commands::Instance(cmd) => commands::instance::handle(&connect(api_base)?, cmd).await?,
        Commands::Firewall(cmd) => commands::firewall::handle(&connect(api_base)?, cmd).await?,
        Commands::Up { name, platform } => {
            commands::up::handle(&connect(api_base)?, &name, &platform).await?
        }
        Commands::Down { name } => commands::down::handle(&connect(api_base)?, &name).await?,
    }

    Ok(())
}

/// Load configuration and build a provider whose polls stop on Ctrl-C
fn connect(api_base: Option<&str>) -> anyhow::Result<GceProvider> {
    let settings = skiff_config::load()?;
    let mut client = GceClient::new(Arc::new(StaticToken::from_env()?));
    if let Some(base) = api_base {
        client = client.with_base_url(base);
    }

    let cancel = CancellationToken::new();
    let provider = GceProvider::new(settings, client)?.with_cancellation(cancel.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling in-flight operations");
            cancel.cancel();
        }
    });

    Ok(provider)
}
