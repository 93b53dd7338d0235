use anyhow::{bail, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::config::CommonConfig;

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct LogsConfig {
    #[serde(default = "LogsConfig::default_level")]
    pub level: String,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

impl CommonConfig for LogsConfig {
    fn complete(&mut self) -> Result<()> {
        self.level = self.level.trim().to_lowercase();
        parse_level(&self.level)?;
        Ok(())
    }
}

impl LogsConfig {
    fn default_level() -> String {
        String::from("info")
    }
}

pub fn parse_level(level: &str) -> Result<LevelFilter> {
    Ok(match level {
        "error" => LevelFilter::Error,
        "warn" | "warning" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        _ => bail!("unknown log level '{}'", level),
    })
}
