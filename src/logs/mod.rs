pub mod config;

use std::io::{self, IsTerminal};
use std::time::SystemTime;

use anyhow::{Context, Result};
use fern::colors::{Color, ColoredLevelConfig};

use self::config::parse_level;

pub fn init(level: &str) -> Result<()> {
    let level = parse_level(level)?;

    let is_terminal = io::stdout().is_terminal();

    let colors = ColoredLevelConfig::new()
        .info(Color::Green)
        .warn(Color::Yellow)
        .debug(Color::Magenta);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            let now = humantime::format_rfc3339_millis(SystemTime::now());
            if is_terminal {
                out.finish(format_args!(
                    "{} [{}] {}",
                    now,
                    colors.color(record.level()),
                    message
                ))
            } else {
                out.finish(format_args!("{} [{}] {}", now, record.level(), message))
            }
        })
        .level(level)
        // The HTTP stacks never log below info.
        .level_for("actix_server", level.min(log::LevelFilter::Info))
        .level_for("hyper_util", level.min(log::LevelFilter::Info))
        .chain(io::stdout())
        .apply()
        .context("init logger")?;

    Ok(())
}
