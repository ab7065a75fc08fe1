//! Ensemble loader service.
//!
//! Creates ensembles and loads forward-model results from run paths into
//! ensemble storage.

mod config;
mod load;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ens_common::RealizationState;
use forward_model::ForwardModelOutcome;
use std::sync::Arc;
use storage::{LocalEnsemble, LocalStorage};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

use config::{parse_realizations, LoaderConfig};
use load::RealizationLoader;

#[derive(Parser, Debug)]
#[command(name = "ens-loader")]
#[command(about = "Load forward-model results into ensemble storage")]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "/etc/ens-loader/config.yaml")]
    config: String,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new ensemble and print its id
    Init,

    /// Run the forward-model callbacks for finished realizations
    Load {
        /// Ensemble to load into (default: create a new one)
        #[arg(short, long)]
        ensemble: Option<Uuid>,

        /// Realizations to load, e.g. `0-4,7` (default: all)
        #[arg(short, long)]
        realizations: Option<String>,
    },

    /// Print the state of every realization
    Status {
        #[arg(short, long)]
        ensemble: Uuid,
    },

    /// List stored ensembles
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = LoaderConfig::load(&args.config)?;

    init_tracing(&args.log_level, &config.logging.format)?;
    info!(config = %args.config, "Starting ensemble loader");
    if let Some(analysis) = &config.analysis {
        info!(alpha = analysis.alpha, std_cutoff = analysis.std_cutoff, "Analysis settings");
    }

    let storage = LocalStorage::open(config.backend(), &config.storage.root)
        .with_context(|| format!("Failed to open storage at {:?}", config.storage.root))?;

    match args.command {
        Command::Init => {
            let ensemble = create_ensemble(&storage, &config)?;
            println!("{}", ensemble.id());
        }
        Command::Load {
            ensemble,
            realizations,
        } => {
            let ensemble = match ensemble {
                Some(id) => storage.open_ensemble(id)?,
                None => create_ensemble(&storage, &config)?,
            };
            run_load(&config, ensemble, realizations.as_deref()).await?;
        }
        Command::Status { ensemble } => {
            let ensemble = storage.open_ensemble(ensemble)?;
            print_status(&ensemble)?;
        }
        Command::List => {
            for index in storage.list_ensembles()? {
                println!(
                    "{}  {:<20} size={:<5} iter={:<3} {}",
                    index.id,
                    index.name,
                    index.ensemble_size,
                    index.iteration,
                    index.started_at.to_rfc3339()
                );
            }
        }
    }

    Ok(())
}

fn init_tracing(log_level: &str, format: &str) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true);

    if format == "pretty" {
        tracing::subscriber::set_global_default(builder.pretty().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    }
    Ok(())
}

/// New ensemble with every realization `Initialized`.
fn create_ensemble(storage: &LocalStorage, config: &LoaderConfig) -> Result<LocalEnsemble> {
    let section = &config.ensemble;
    let ensemble = storage.create_ensemble(
        section.experiment_id.unwrap_or_else(Uuid::new_v4),
        section.name.as_str(),
        section.size,
        section.iteration,
        None,
    )?;
    for iens in 0..ensemble.ensemble_size() {
        ensemble.try_transition(iens, RealizationState::Initialized)?;
    }
    Ok(ensemble)
}

async fn run_load(
    config: &LoaderConfig,
    ensemble: LocalEnsemble,
    selection: Option<&str>,
) -> Result<()> {
    let realizations = match selection {
        Some(s) => parse_realizations(s, ensemble.ensemble_size())?,
        None => (0..ensemble.ensemble_size()).collect(),
    };

    let ensemble = Arc::new(ensemble);
    let loader = RealizationLoader::new(
        Arc::new(ForwardModelOutcome::with_defaults()),
        Arc::new(config.ensemble_config()?),
        Arc::clone(&ensemble),
        config.runpaths()?,
    );

    let cancel = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let summary = loader.load_until(&realizations, cancel).await?;

    for (iens, message) in &summary.failed {
        eprintln!("realization {iens}: {}", message.trim_end());
    }
    println!(
        "{}: loaded {}, failed {}",
        ensemble.id(),
        summary.loaded.len(),
        summary.failed.len()
    );
    anyhow::ensure!(
        summary.is_success(),
        "{} realizations failed to load",
        summary.failed.len()
    );
    Ok(())
}

fn print_status(ensemble: &LocalEnsemble) -> Result<()> {
    let states = ensemble.state_map().snapshot()?;
    for (iens, state) in states.iter().enumerate() {
        println!("{iens:>5}  {state}");
    }
    for state in RealizationState::ALL {
        let count = states.iter().filter(|&&s| s == state).count();
        if count > 0 {
            println!("{state}: {count}");
        }
    }
    Ok(())
}
