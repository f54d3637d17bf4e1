//! Transcoder Provider driver
//!
//! Runs one provider operation against JSON attribute trees, standing in for
//! the host that normally drives the provider.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use transcoder_common::PRESET_RESOURCE_TYPE;
use transcoder_provider::schema::Diagnostic;
use transcoder_provider::state::{decode_dynamic_value, DynamicValue};
use transcoder_provider::{ProviderConfig, TranscoderProvider};

/// Elastic Transcoder preset provider
#[derive(Parser)]
#[command(name = "terraform-provider-transcoder")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Resource type to operate on
    #[arg(long, default_value = PRESET_RESOURCE_TYPE, global = true)]
    resource_type: String,

    /// Provider configuration file (TOML)
    #[arg(long, env = "TRANSCODER_CONFIG", global = true)]
    config_file: Option<PathBuf>,

    /// AWS region
    #[arg(long, global = true)]
    region: Option<String>,

    /// Shared config profile
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Service endpoint override
    #[arg(long, global = true)]
    endpoint_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resource schemas
    Schema,

    /// Check a configuration against the schema
    Validate {
        /// Configuration attribute tree (JSON)
        #[arg(long)]
        config: PathBuf,
    },

    /// Show what applying a configuration would do
    Plan {
        /// Prior state (JSON); omit for a new resource
        #[arg(long)]
        prior: Option<PathBuf>,

        /// Proposed configuration (JSON); omit to plan a destroy
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create, update or delete a resource
    Apply {
        /// Prior state (JSON); omit to create
        #[arg(long)]
        prior: Option<PathBuf>,

        /// Planned state (JSON); omit to delete
        #[arg(long)]
        planned: Option<PathBuf>,
    },

    /// Refresh a resource from the service
    Read {
        /// Current state (JSON)
        #[arg(long)]
        state: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries results only
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config_file {
        Some(path) => ProviderConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => ProviderConfig::default(),
    };
    config = config.merge(ProviderConfig::from_env()).merge(ProviderConfig {
        region: cli.region.clone(),
        profile: cli.profile.clone(),
        endpoint_url: cli.endpoint_url.clone(),
    });

    let provider = TranscoderProvider::new(config);
    let type_name = cli.resource_type.as_str();

    match cli.command {
        Commands::Schema => print_json(&provider.resource_schemas())?,
        Commands::Validate { config } => {
            let config = read_tree(&config)?;
            let diags = provider.validate_resource_config(type_name, &config)?;
            print_json(&diags)?;
            exit_on_errors(&diags);
        }
        Commands::Plan { prior, config } => {
            let prior = read_optional_tree(prior.as_deref())?;
            let config = read_optional_tree(config.as_deref())?;
            let plan = provider.plan_resource_change(type_name, prior.as_ref(), config.as_ref())?;
            print_json(&plan)?;
        }
        Commands::Apply { prior, planned } => {
            let prior = read_optional_tree(prior.as_deref())?;
            let planned = read_optional_tree(planned.as_deref())?;
            provider.configure().await;
            let response = provider
                .apply_resource_change(type_name, prior.as_ref(), planned.as_ref())
                .await?;
            print_json(&response)?;
            exit_on_errors(&response.diagnostics);
        }
        Commands::Read { state } => {
            let state = read_tree(&state)?;
            provider.configure().await;
            let response = provider.read_resource(type_name, &state).await?;
            if response.new_state.is_none() {
                info!("Resource no longer exists");
            }
            print_json(&response)?;
            exit_on_errors(&response.diagnostics);
        }
    }

    Ok(())
}

fn read_tree(path: &Path) -> Result<DynamicValue> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    decode_dynamic_value(&bytes)
}

fn read_optional_tree(path: Option<&Path>) -> Result<Option<DynamicValue>> {
    path.map(read_tree).transpose()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn exit_on_errors(diags: &[Diagnostic]) {
    if diags.iter().any(Diagnostic::is_error) {
        std::process::exit(1);
    }
}
