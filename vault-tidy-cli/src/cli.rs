use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "vault-tidy")]
#[command(about = "Keep a Markdown vault's attachments next to the notes that use them")]
#[command(version)]
pub struct Cli {
    /// Config file path (defaults to ~/.config/vault-tidy/config.toml)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging (ignored when RUST_LOG is set)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print the run report as JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Move dated notes into <year>/ folders together with their resources
    SortByYear {
        /// Folder whose notes are sorted (not recursive)
        #[arg(long, env = "VAULT_TIDY_PATH")]
        path: PathBuf,

        /// Folder the notes' resources currently live in
        #[arg(long)]
        resources: Option<PathBuf>,

        /// Apply the changes (default is a dry run)
        #[arg(long)]
        execute: bool,
    },

    /// Move every resource to the lowest folder shared by all notes using it
    SortResources {
        /// Vault root
        #[arg(long, env = "VAULT_TIDY_PATH")]
        path: PathBuf,

        /// Apply the changes (default is a dry run)
        #[arg(long)]
        execute: bool,
    },
}
