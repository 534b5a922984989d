use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about = "Single-disk simulated file system")]
pub struct Cli {
    #[command(subcommand)]
    pub action: Action,
}

#[derive(Subcommand)]
pub enum Action {
    /// Execute a command file line by line
    Run {
        /// Command file
        commands: PathBuf,
    },

    /// Write an empty 128-block disk image
    Format {
        /// Image path, truncated if it exists
        image: PathBuf,
    },

    /// Report every consistency rule the image violates
    Check {
        /// Image path
        image: PathBuf,
    },
}
