use clap::{Parser, Subcommand};
use std::path::PathBuf;

use thoth_client::saxon::{DEFAULT_SAXON_JAR, DEFAULT_STYLESHEET};
use thoth_client::transkribus::DEFAULT_BASE_URL;

/// CLI configuration parsed from command line arguments and environment variables
#[derive(Parser, Debug)]
#[command(name = "thoth")]
#[command(
    author,
    version,
    about = "Exports Transkribus transcriptions and converts them to TEI"
)]
#[command(after_help = "Examples:
  thoth export
  thoth export --config ~/archive.toml --output ./exports --skip-transform
  thoth collections
  thoth transform temp/2026-3-7-9-5")]
pub struct Cli {
    /// Transkribus account name, overrides the configuration file
    #[arg(long, env = "TRANSKRIBUS_USERNAME", global = true)]
    pub username: Option<String>,

    /// Transkribus account password, overrides the configuration file
    #[arg(
        long,
        env = "TRANSKRIBUS_PASSWORD",
        global = true,
        hide_env_values = true
    )]
    pub password: Option<String>,

    /// Base URL of the Transkribus platform
    #[arg(long, global = true, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Log at debug level instead of info
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Export transcriptions per the configuration file, then convert to TEI
    #[command(after_help = "Examples:
  thoth export                              # Config from the default location
  thoth export --config ~/archive.toml      # Explicit configuration file
  thoth export --output ./exports           # Run directory under ./exports
  thoth export --skip-transform             # PAGE XML only, no TEI conversion")]
    Export {
        /// Path to the export configuration file
        #[arg(short, long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Directory the timestamped run directory is created under
        #[arg(short, long, default_value = "temp")]
        output: PathBuf,

        /// Skip the PAGE-to-TEI conversion after the export
        #[arg(long)]
        skip_transform: bool,

        /// Path to the Saxon jar
        #[arg(long, value_name = "JAR", default_value = DEFAULT_SAXON_JAR)]
        saxon_jar: PathBuf,

        /// Path to the PAGE-to-TEI XSLT stylesheet
        #[arg(long, value_name = "XSL", default_value = DEFAULT_STYLESHEET)]
        stylesheet: PathBuf,
    },
    /// List the collections the account can access
    #[command(after_help = "Example: thoth collections --username reader@example.org")]
    Collections {
        /// Configuration file to take credentials from
        #[arg(short, long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
    /// Convert an existing export tree to TEI
    #[command(after_help = "Example: thoth transform temp/2026-3-7-9-5")]
    Transform {
        /// Timestamped run directory of an earlier export
        #[arg(value_name = "RUN_DIR")]
        run_dir: PathBuf,

        /// Path to the Saxon jar
        #[arg(long, value_name = "JAR", default_value = DEFAULT_SAXON_JAR)]
        saxon_jar: PathBuf,

        /// Path to the PAGE-to-TEI XSLT stylesheet
        #[arg(long, value_name = "XSL", default_value = DEFAULT_STYLESHEET)]
        stylesheet: PathBuf,
    },
}
