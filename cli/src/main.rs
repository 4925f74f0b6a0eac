use std::path::PathBuf;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::Commands;

const LOG_FILE_PREFIX: &str = "cqbridge.log";

#[derive(Parser, PartialEq, Debug)]
#[command(name = "cqbridge")]
#[command(about = "CQ-HTTP / OneBot relay for ChatBridge", long_about = None)]
struct Cli {
    /// Enable debug output
    #[arg(long = "debug", default_value_t = false)]
    debug: bool,

    /// Also write daily-rotated logs to this directory
    #[arg(long = "log-dir")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

fn init_tracing(debug: bool, log_dir: Option<&PathBuf>) -> Option<WorkerGuard> {
    let default_filter = if debug {
        format!("info,cqbridge_relay=debug,{}=debug", env!("CARGO_CRATE_NAME"))
    } else {
        "info".to_string()
    };

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    guard
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.debug, cli.log_dir.as_ref());

    if let Err(error) = cli.command.run().await {
        eprintln!("{error}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::Cli;
    use crate::commands::Commands;

    #[test]
    fn parses_global_flags_and_subcommand() {
        let cli = match Cli::try_parse_from([
            "cqbridge",
            "--debug",
            "--log-dir",
            "/tmp/cqbridge",
            "init",
            "--group-id",
            "42",
            "--force",
        ]) {
            Ok(cli) => cli,
            Err(error) => panic!("parse failed: {error}"),
        };

        assert!(cli.debug);
        assert_eq!(
            cli.log_dir.as_deref().map(|path| path.to_string_lossy().into_owned()),
            Some("/tmp/cqbridge".to_string())
        );
        match cli.command {
            Commands::Init {
                group_id, force, ..
            } => {
                assert_eq!(group_id, Some(42));
                assert!(force);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn check_accepts_config_path() {
        let cli = match Cli::try_parse_from(["cqbridge", "check", "--config", "relay.toml"]) {
            Ok(cli) => cli,
            Err(error) => panic!("parse failed: {error}"),
        };
        assert!(matches!(cli.command, Commands::Check { config: Some(_) }));
    }
}
