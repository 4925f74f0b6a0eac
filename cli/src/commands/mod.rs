use std::path::PathBuf;

use clap::Subcommand;

pub mod gateway;

#[derive(Subcommand, PartialEq, Debug)]
pub enum Commands {
    /// Write a default relay config file
    Init {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        group_id: Option<i64>,
        #[arg(long, env = "CQBRIDGE_ACCESS_TOKEN")]
        access_token: Option<String>,
        #[arg(long)]
        force: bool,
    },

    /// Load and validate the relay config, then print a summary
    Check {
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Connect to the OneBot endpoint once and print the bot identity
    Probe {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Commands {
    pub async fn run(self) -> Result<(), String> {
        match self {
            Commands::Init {
                config,
                group_id,
                access_token,
                force,
            } => gateway::handle_init(config, group_id, access_token, force).await,
            Commands::Check { config } => gateway::handle_check(config).await,
            Commands::Probe { config } => gateway::handle_probe(config).await,
        }
    }
}
