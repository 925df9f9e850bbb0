//! CLI for ferry.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ferry_core::config;
use ferry_core::Transfer;
use std::path::PathBuf;

use commands::{run_classify, run_local, run_remote, run_upload_batch};

/// Top-level CLI for ferry.
#[derive(Debug, Parser)]
#[command(name = "ferry")]
#[command(about = "ferry: move files between local disk, HTTP and object storage", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Show how a URI or path is classified.
    Classify {
        /// Local path, file://, http(s):// or gs:// URI.
        uri: String,
    },

    /// Fetch a resource into the scratch area and print the local path.
    Local {
        /// Local path, file://, http(s):// or gs:// URI.
        uri: String,
    },

    /// Upload a resource to the object store under a fresh name.
    Remote {
        /// Local path, file://, http(s):// or gs:// URI.
        uri: String,
        /// Destination prefix (defaults to `remote_prefix` from config).
        #[arg(long, value_name = "GS_URI")]
        prefix: Option<String>,
    },

    /// Upload files in order and record index → object in a JSON manifest.
    UploadBatch {
        /// Files (or URIs) to upload; their position is the manifest index.
        #[arg(required = true)]
        files: Vec<String>,
        /// Destination prefix (defaults to `remote_prefix` from config).
        #[arg(long, value_name = "GS_URI")]
        prefix: Option<String>,
        /// Write the manifest to this path.
        #[arg(long, value_name = "PATH")]
        manifest: Option<PathBuf>,
        /// Also upload the manifest to `<prefix>/metadata.json`.
        #[arg(long)]
        publish: bool,
    },
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Classify { uri } => run_classify(&uri)?,
            CliCommand::Local { uri } => {
                let transfer = Transfer::from_config(&cfg);
                run_local(&transfer, &uri)?;
            }
            CliCommand::Remote { uri, prefix } => {
                let transfer = Transfer::from_config(&cfg);
                run_remote(&transfer, &uri, prefix.as_deref())?;
            }
            CliCommand::UploadBatch {
                files,
                prefix,
                manifest,
                publish,
            } => {
                let transfer = Transfer::from_config(&cfg);
                run_upload_batch(&transfer, &files, prefix.as_deref(), manifest.as_deref(), publish)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
