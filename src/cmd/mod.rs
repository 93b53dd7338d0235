use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, warn};

use crate::config::{ConfigArgs, ConfigSource};
use crate::{display, logs};

mod check;
mod serve;
mod sync;

#[derive(Parser)]
#[command(author, version, about, arg_required_else_help = true)]
pub struct App {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Override the log level from config: error, warn, info or debug.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Print the effective configuration (JSON) and exit.
    #[arg(long)]
    pub print_config: bool,

    #[command(subcommand)]
    pub commands: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    Sync(sync::SyncArgs),
    Check(check::CheckArgs),
    Serve(serve::ServeArgs),
}

impl App {
    pub async fn run(&self) -> Result<()> {
        let (cfg, source) = self.config.load()?;
        if self.print_config {
            return display::display_json(&cfg);
        }

        let level = self.log_level.as_deref().unwrap_or(&cfg.logs.level);
        logs::init(level).context("init logs")?;
        match source {
            ConfigSource::File(path) => debug!("Loaded config from '{}'", path.display()),
            ConfigSource::Defaults(path) => {
                warn!("Config file '{}' not found, using defaults", path.display())
            }
        }

        match &self.commands {
            Some(Commands::Sync(args)) => args.run(cfg).await,
            Some(Commands::Check(args)) => args.run(cfg).await,
            Some(Commands::Serve(args)) => args.run(cfg).await,
            None => Ok(()),
        }
    }
}
