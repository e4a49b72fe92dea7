use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod config;
mod daemon;
mod notifications_cmd;
mod notifier;
mod reminders_cmd;
mod state;
mod tasks_cmd;
mod timer;

use config::{init_config, load_config, render_config};
use state::Paths;

#[derive(Parser, Debug)]
#[command(
    name = "remindful",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("REMINDFUL_BUILD_SHA"), ")"),
    about = "Tasks with one-shot and repeating reminders"
)]
struct Cli {
    /// State directory (default: $REMINDFUL_HOME or ~/.remindful)
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add, list, update and delete tasks
    Task {
        #[command(subcommand)]
        command: tasks_cmd::TaskCommand,
    },

    /// Set, cancel and list reminders
    Reminder {
        #[command(subcommand)]
        command: reminders_cmd::ReminderCommand,
    },

    /// Delivered notification history
    Notifications {
        #[command(subcommand)]
        command: notifications_cmd::NotificationsCommand,
    },

    /// Write or print ~/.remindful/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Stay in the foreground and deliver reminders until ctrl-c
    Run,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config if none exists
    Init,
    /// Print the effective config
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let paths = Paths::resolve(cli.home)?;
    let cfg = load_config(&paths)?;
    init_tracing(&cfg.logging.filter);

    match cli.command {
        Command::Task { command } => tasks_cmd::run(command, &paths, &cfg)?,
        Command::Reminder { command } => reminders_cmd::run(command, &paths, &cfg)?,
        Command::Notifications { command } => notifications_cmd::run(command, &paths, &cfg)?,
        Command::Config { command } => match command {
            ConfigCommand::Init => {
                if init_config(&paths)? {
                    println!("Wrote {}", paths.config_path().display());
                } else {
                    println!("Config already exists: {}", paths.config_path().display());
                }
            }
            ConfigCommand::Show => {
                println!("# {}", paths.config_path().display());
                print!("{}", render_config(&cfg)?);
            }
        },
        Command::Run => daemon::run(&paths, &cfg).await?,
    }

    Ok(())
}

/// Logs go to stderr so command output stays clean. `RUST_LOG` overrides
/// the configured filter.
fn init_tracing(configured: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
