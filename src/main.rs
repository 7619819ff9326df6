//! # tsi-env
//!
//! Command-line host for the Time Series Insights Environment provider.
//!
//! Drives the lifecycle handlers directly, the way a plan/apply engine would.
//!
//! ## Usage
//!
//! ```bash
//! # Create an environment from a JSON configuration record
//! tsi-env create --config env1.json
//!
//! # Apply a changed configuration to an existing environment
//! tsi-env update --config env1.json --id /subscriptions/.../environments/env1
//!
//! # Check whether a change can be applied in place
//! tsi-env plan --prior env1.old.json --config env1.json
//!
//! # Read, delete, validate an import ID
//! tsi-env read /subscriptions/.../environments/env1
//! tsi-env delete /subscriptions/.../environments/env1
//! tsi-env validate-id /subscriptions/.../environments/env1
//! ```

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tsi_environment_provider::constants::TSI_ENVIRONMENT_RESOURCE_TYPE;
use tsi_environment_provider::observability::{self, metrics};
use tsi_environment_provider::registry::{self, RESOURCE_TYPES};
use tsi_environment_provider::resource::{parse_sku, AdapterSettings};
use tsi_environment_provider::{
    ArmEnvironmentsClient, EnvironmentConfig, EnvironmentId, EnvironmentResourceAdapter,
    OperationContext, ProviderConfig,
};

/// Time Series Insights Environment provider CLI
#[derive(Parser)]
#[command(name = "tsi-env")]
#[command(
    about = "Manage Azure Time Series Insights Standard environments",
    long_about = None,
    after_help = "\
Configuration is read from the environment:
  ARM_SUBSCRIPTION_ID, ARM_ENDPOINT, ARM_CLIENT_ID, ARM_ACCESS_TOKEN,
  ARM_RESOURCES_SHOULD_BE_IMPORTED, ARM_LRO_POLL_INTERVAL_SECS,
  ARM_TIMEOUT_{CREATE,READ,UPDATE,DELETE}_SECS, LOG_LEVEL, LOG_FORMAT

Examples:
  tsi-env create --config env1.json
  tsi-env read /subscriptions/<sub>/resourceGroups/rg1/providers/Microsoft.TimeSeriesInsights/environments/env1
  tsi-env sku S1_5
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print Prometheus metrics to stderr when the command finishes
    #[arg(long, global = true)]
    print_metrics: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an environment that is not yet managed
    Create {
        /// JSON configuration record
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,
    },
    /// Update an existing environment in place
    Update {
        /// JSON configuration record
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,

        /// ID returned by `create`
        #[arg(long, value_name = "ID")]
        id: String,
    },
    /// Show the current state of an environment as a configuration record
    Read {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Delete an environment
    Delete {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Report which changed fields would force replacement
    Plan {
        /// Configuration currently applied
        #[arg(long, value_name = "FILE")]
        prior: PathBuf,

        /// Desired configuration
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,
    },
    /// Validate an import ID without contacting Azure
    ValidateId {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Expand a `sku_name` into tier and capacity
    Sku {
        #[arg(value_name = "SKU_NAME")]
        sku_name: String,
    },
    /// List the resource types served by this provider
    ResourceTypes,
}

#[tokio::main]
async fn main() -> Result<()> {
    // rustls 0.23 needs a process-wide crypto provider before any TLS client is built
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_existing| anyhow!("Failed to install rustls crypto provider"))?;

    let config = ProviderConfig::from_env();
    observability::init_tracing(&config).context("Failed to initialize tracing")?;
    metrics::register_metrics()?;

    let cli = Cli::parse();
    let print_metrics = cli.print_metrics;

    let result = run(cli.command, &config).await;

    if print_metrics {
        eprintln!("{}", metrics::gather_metrics()?);
    }
    result
}

async fn run(command: Commands, config: &ProviderConfig) -> Result<()> {
    match command {
        Commands::Create { config: path } => {
            let desired = load_config(&path)?;
            let (adapter, ctx) = connect(config)?;
            let id = adapter.create_or_update(&desired, None, &ctx).await?;
            println!("{id}");
            Ok(())
        }
        Commands::Update { config: path, id } => {
            let desired = load_config(&path)?;
            let id = EnvironmentResourceAdapter::validate_id(&id)?;
            if id.name != desired.name || id.resource_group != desired.resource_group_name {
                bail!(
                    "ID {} does not address environment {:?} in resource group {:?}; \
                     changing name or resource_group_name requires replacement",
                    id,
                    desired.name,
                    desired.resource_group_name
                );
            }
            let (adapter, ctx) = connect(config)?;
            let id = adapter.create_or_update(&desired, Some(&id), &ctx).await?;
            println!("{id}");
            Ok(())
        }
        Commands::Read { id } => {
            let id = EnvironmentResourceAdapter::validate_id(&id)?;
            let (adapter, ctx) = connect(config)?;
            match adapter.read(&id, &ctx).await? {
                Some(current) => println!("{}", serde_json::to_string_pretty(&current)?),
                None => bail!("environment {id} does not exist"),
            }
            Ok(())
        }
        Commands::Delete { id } => {
            let id = EnvironmentResourceAdapter::validate_id(&id)?;
            let (adapter, ctx) = connect(config)?;
            adapter.delete(&id, &ctx).await?;
            println!("Deleted {id}");
            Ok(())
        }
        Commands::Plan {
            prior,
            config: path,
        } => {
            let prior = load_config(&prior)?;
            let desired = load_config(&path)?;
            desired.validate()?;
            let fields = desired.replacement_fields(&prior);
            if fields.is_empty() {
                println!("update in place");
            } else {
                println!("replacement required: {}", fields.join(", "));
            }
            Ok(())
        }
        Commands::ValidateId { id } => {
            let id = validate_import_id(&id)?;
            println!("subscription:   {}", id.subscription_id);
            println!("resource group: {}", id.resource_group);
            println!("name:           {}", id.name);
            Ok(())
        }
        Commands::Sku { sku_name } => {
            let sku = parse_sku(&sku_name)?;
            println!("tier:     {}", sku.tier);
            println!("capacity: {}", sku.capacity);
            Ok(())
        }
        Commands::ResourceTypes => {
            for resource in RESOURCE_TYPES {
                println!(
                    "{}  (timeouts: create {:?}, read {:?}, update {:?}, delete {:?}; force-new: {})",
                    resource.name,
                    resource.timeouts.create,
                    resource.timeouts.read,
                    resource.timeouts.update,
                    resource.timeouts.delete,
                    resource.force_new.join(", ")
                );
            }
            Ok(())
        }
    }
}

/// Build the adapter and a context that cancels on Ctrl-C
fn connect(config: &ProviderConfig) -> Result<(EnvironmentResourceAdapter, OperationContext)> {
    let client = ArmEnvironmentsClient::from_config(config)
        .context("Failed to create Azure Resource Manager client")?;
    let adapter =
        EnvironmentResourceAdapter::new(Arc::new(client), AdapterSettings::from(config));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, abandoning the in-flight operation");
            trigger.cancel();
        }
    });

    Ok((
        adapter,
        OperationContext::new(config.timeouts).with_cancellation(cancel),
    ))
}

fn validate_import_id(raw: &str) -> Result<EnvironmentId> {
    let resource = registry::lookup(TSI_ENVIRONMENT_RESOURCE_TYPE)
        .ok_or_else(|| anyhow!("environment resource type is not registered"))?;
    (resource.validate_import_id)(raw)?;
    Ok(EnvironmentId::parse(raw)?)
}

fn load_config(path: &Path) -> Result<EnvironmentConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse configuration file {}", path.display()))
}
