use anyhow::{Context, Result};
use catalog_import::{
    Collaborators, ImportConfig, Importer, MemoryCatalogStore, ProcessingOutcome, DEFAULT_CONFIG,
};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::{fs, path::PathBuf};
use tracing::{error, info, warn, Level};

/// Catalog Import
/// Imports product rows from CSV or XLSX files into a catalog store
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output for detailed processing information
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a product file into a store
    Process {
        /// CSV or XLSX file with one product row per line
        #[arg(short, long, value_name = "PATH TO PRODUCT FILE")]
        input: PathBuf,

        /// JSON store file; a missing file starts an empty store
        #[arg(short, long, value_name = "PATH TO STORE")]
        store: PathBuf,

        /// Import configuration, defaults are used when omitted
        #[arg(short, long, value_name = "PATH TO CONFIG")]
        config: Option<PathBuf>,

        /// Where to save the updated store (defaults to --store)
        #[arg(short, long, value_name = "OUTPUT PATH")]
        output: Option<PathBuf>,

        /// Override the configured number of workers
        #[arg(short, long)]
        workers: Option<usize>,

        /// Fail when any row is rejected
        #[arg(long)]
        strict: bool,
    },
    /// Generate a commented configuration with the default settings
    GenerateConfig {
        /// Output path for the generated configuration
        #[arg(
            short,
            long,
            default_value = "import-config.jsonc",
            value_name = "OUTPUT PATH"
        )]
        output: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        /// Path to the configuration file to validate
        #[arg(
            short,
            long,
            default_value = "import-config.jsonc",
            value_name = "PATH TO CONFIG"
        )]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with appropriate level
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    info!("Catalog import starting up...");

    match &cli.command {
        Commands::GenerateConfig { output } => generate_config_command(output),
        Commands::Validate { config } => validate_command(config),
        Commands::Process {
            input,
            store,
            config,
            output,
            workers,
            strict,
        } => process_command(input, store, config, output, *workers, *strict).await,
    }
}

fn load_config(config_path: &Option<PathBuf>) -> Result<ImportConfig> {
    match config_path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Configuration file not found: {}", path.display());
            }
            ImportConfig::from_file(path)
                .context("Failed to load configuration. See errors for additional details:")
        }
        None => {
            info!("No configuration given, using the defaults");
            Ok(ImportConfig::default())
        }
    }
}

async fn process_command(
    input: &PathBuf,
    store_path: &PathBuf,
    config_path: &Option<PathBuf>,
    output: &Option<PathBuf>,
    workers: Option<usize>,
    strict: bool,
) -> Result<()> {
    if strict {
        info!("Running in strict mode");
    }

    // Verify input file exists
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    let mut config = load_config(config_path)?;
    if let Some(workers) = workers {
        config.workers = workers;
    }

    info!("Validating configuration...");
    config.validate().context("Failed to validate configuration")?;

    let store = Arc::new(
        MemoryCatalogStore::load(store_path)
            .context(format!("Failed to load store from: {}", store_path.display()))?,
    );

    info!("Initializing importer...");
    let importer = Importer::new(config, Collaborators::from_store(Arc::clone(&store)))
        .context("Failed to initialize importer")?;

    info!("Beginning import of {}", input.display());
    let report = importer
        .import_file(input)
        .await
        .context("Failed to import product file")?;
    report.log_summary();

    let output_path = output.clone().unwrap_or_else(|| store_path.clone());
    store
        .save(&output_path)
        .context(format!("Failed to save store to: {}", output_path.display()))?;

    match report.outcome() {
        ProcessingOutcome::Success => info!("Import completed successfully"),
        ProcessingOutcome::SuccessWithWarnings(warnings) => {
            info!("Import completed with {} warnings", warnings.len());
            for warning in warnings {
                warn!("{}", warning.message);
            }
        }
        ProcessingOutcome::Failure { errors, warnings } => {
            for warning in warnings {
                warn!("{}", warning.message);
            }
            error!("Import finished with {} rejected rows", errors.len());
            if strict {
                anyhow::bail!("{} rows were rejected in strict mode", errors.len());
            }
        }
    }

    Ok(())
}

fn generate_config_command(output: &PathBuf) -> Result<()> {
    info!("Generating configuration template...");

    // if output is a directory, append the default file name
    let full_file_output_path = if output.is_dir() {
        output.join("import-config.jsonc")
    } else {
        output.into()
    };

    fs::write(&full_file_output_path, DEFAULT_CONFIG)
        .context(format!("Failed to write configuration to: {}", output.display()))?;

    info!(
        "Successfully generated configuration template at: {}",
        full_file_output_path.display()
    );
    Ok(())
}

fn validate_command(config_path: &PathBuf) -> Result<()> {
    info!("Validating configuration...");

    // Verify config file exists
    if !config_path.exists() {
        anyhow::bail!(
            "Configuration file not found: {}. Try using --config <PATH TO CONFIG>",
            config_path.display()
        );
    }

    let config = ImportConfig::from_file(config_path)
        .context("Failed to parse configuration. See errors for additional details:")?;

    config.validate().context("Failed to validate configuration")?;

    info!("Configuration validation successful");
    info!(
        "{} product columns, {} stock columns, {} image types, {} workers",
        config.product_columns.len(),
        config.stock_columns.len(),
        config.image_types.len(),
        config.workers
    );
    Ok(())
}
