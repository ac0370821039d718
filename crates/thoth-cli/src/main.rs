use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use dotenvy::dotenv;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use thoth_cli::{Cli, Command};
use thoth_client::{SaxonTransformer, TranskribusClient};
use thoth_core::{
    default_config_path, job_from_config, load_config_source, run_export, transform_export_tree,
    AppError, CredentialOverrides, RunSummary, TransformSummary,
};

/// Run completed but at least one collection, document, page or transform
/// invocation failed.
const EXIT_PARTIAL: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables from .env file
    dotenv().ok();

    // Parse command line arguments
    let cli = Cli::parse();

    // Setup logging (stderr to keep stdout clean for listings)
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let overrides = CredentialOverrides {
        username: cli.username.clone(),
        password: cli.password.clone(),
    };

    // Execute command
    let result = match cli.command {
        Command::Export {
            config,
            output,
            skip_transform,
            saxon_jar,
            stylesheet,
        } => {
            export(
                &cli.base_url,
                &overrides,
                config,
                &output,
                skip_transform,
                saxon_jar,
                stylesheet,
            )
            .await
        }
        Command::Collections { config } => collections(&cli.base_url, &overrides, config).await,
        Command::Transform {
            run_dir,
            saxon_jar,
            stylesheet,
        } => transform(&run_dir, saxon_jar, stylesheet).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

/// Run the full pipeline: export every configured collection, then convert
/// the run directory to TEI unless told not to.
async fn export(
    base_url: &str,
    overrides: &CredentialOverrides,
    config: Option<PathBuf>,
    output: &Path,
    skip_transform: bool,
    saxon_jar: PathBuf,
    stylesheet: PathBuf,
) -> Result<ExitCode, AppError> {
    let config_path = resolve_config_path(config)?;
    let raw = load_config_source(&config_path)?;
    let job = job_from_config(&raw, overrides)?;

    let client = TranskribusClient::new(base_url)?;
    let summary = run_export(&client, &job, output).await?;
    log_export_summary(&summary);

    let mut failed = summary.has_failures();
    if skip_transform {
        info!("Skipping the TEI conversion as requested.");
    } else {
        match SaxonTransformer::from_path(saxon_jar, stylesheet) {
            Some(transformer) => {
                let converted = transform_export_tree(&transformer, &summary.output_dir).await?;
                failed = failed || !converted.is_success();
                log_transform_summary(&converted);
            }
            None => {
                // The exported PAGE XML is already on disk, so a missing
                // java install downgrades the run instead of aborting it.
                error!(
                    "{}",
                    AppError::Transform("no java binary found in PATH".to_string()).user_message()
                );
                failed = true;
            }
        }
    }

    Ok(if failed {
        ExitCode::from(EXIT_PARTIAL)
    } else {
        ExitCode::SUCCESS
    })
}

/// Authenticate and print the accessible collections to stdout.
async fn collections(
    base_url: &str,
    overrides: &CredentialOverrides,
    config: Option<PathBuf>,
) -> Result<ExitCode, AppError> {
    let credentials = credentials_only(overrides, config)?;
    let client = TranskribusClient::new(base_url)?;

    let session = client.authenticate(&credentials).await?;
    info!("User successfully authenticated.");
    let accessible = client.list_collections(&session).await?;

    if accessible.is_empty() {
        println!("No accessible collection.");
    } else {
        for collection in &accessible {
            println!("{:>10}  {}", collection.id, collection.name);
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Convert an existing export tree to TEI.
async fn transform(
    run_dir: &Path,
    saxon_jar: PathBuf,
    stylesheet: PathBuf,
) -> Result<ExitCode, AppError> {
    let transformer = SaxonTransformer::from_path(saxon_jar, stylesheet)
        .ok_or_else(|| AppError::Transform("no java binary found in PATH".to_string()))?;

    let summary = transform_export_tree(&transformer, run_dir).await?;
    log_transform_summary(&summary);
    Ok(if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_PARTIAL)
    })
}

fn resolve_config_path(config: Option<PathBuf>) -> Result<PathBuf, AppError> {
    config.or_else(default_config_path).ok_or_else(|| {
        AppError::Generic(
            "no configuration directory on this platform, pass --config".to_string(),
        )
    })
}

/// Credentials for commands that need nothing else from the configuration.
///
/// Overrides win; the file is only consulted for whichever credential is
/// still missing, and only if it exists (the `collections` command should
/// work with just the environment set).
fn credentials_only(
    overrides: &CredentialOverrides,
    config: Option<PathBuf>,
) -> Result<thoth_core::Credentials, AppError> {
    let mut username = overrides.username.clone();
    let mut password = overrides.password.clone();

    if username.is_none() || password.is_none() {
        if let Ok(path) = resolve_config_path(config) {
            if let Ok(raw) = load_config_source(&path) {
                let file: thoth_core::ExportFileConfig = toml::from_str(&raw).unwrap_or_default();
                username = username.or(file.username);
                password = password.or(file.password);
            }
        }
    }

    match (username, password) {
        (Some(username), Some(password)) => Ok(thoth_core::Credentials::new(username, password)),
        _ => Err(AppError::Auth(
            "no credentials given; set TRANSKRIBUS_USERNAME and TRANSKRIBUS_PASSWORD or pass --config"
                .to_string(),
        )),
    }
}

fn log_export_summary(summary: &RunSummary) {
    info!(
        "Exported {} page(s) into {}",
        summary.exported_pages(),
        summary.output_dir.display()
    );
    for name in &summary.unresolved {
        warn!("Collection \"{}\" was not exported.", name);
    }
    for collection in &summary.collections {
        match &collection.error {
            Some(error) => warn!("Collection \"{}\" failed: {}", collection.name, error),
            None => info!(
                "Collection \"{}\": {} exported, {} skipped by status, {} invalid, {} failed page(s), {} failed document(s)",
                collection.name,
                collection.stats.exported,
                collection.stats.skipped_status,
                collection.stats.skipped_invalid,
                collection.stats.failed,
                collection.stats.failed_documents
            ),
        }
    }
}

fn log_transform_summary(summary: &TransformSummary) {
    info!(
        "Transformed {} document directorie(s), {} failed",
        summary.transformed, summary.failed
    );
}
