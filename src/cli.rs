use clap::{Parser, Subcommand};

use crate::commands;
use crate::error::Result;

/// Tripcheck - acceptance scenarios for the travel search site
#[derive(Parser)]
#[command(name = "tripcheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Backend module (DirectHttpBrowser or RemoteDriverBrowser)
    #[arg(long, global = true)]
    pub module: Option<String>,

    /// Base URL of the site under test
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run acceptance scenarios
    Run {
        /// Only run scenarios whose name contains this string
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// List available scenarios
    List,
}

impl Cli {
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            Commands::Run { filter } => commands::run::run(self, filter.as_deref()).await,
            Commands::List => commands::list::run(),
        }
    }
}
