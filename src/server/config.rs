use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::config::{expandenv, CommonConfig};

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_bind")]
    pub bind: String,

    pub keep_alive_secs: Option<u64>,

    pub workers: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: Self::default_bind(),
            keep_alive_secs: None,
            workers: None,
        }
    }
}

impl CommonConfig for ServerConfig {
    fn complete(&mut self) -> Result<()> {
        self.bind = expandenv("bind", &self.bind)?;
        if self.bind.is_empty() {
            bail!("bind is required");
        }

        if let Some(workers) = self.workers {
            if workers == 0 || workers > Self::MAX_WORKERS {
                bail!("workers must be in range [1, {}]", Self::MAX_WORKERS);
            }
        }

        if let Some(0) = self.keep_alive_secs {
            bail!("keep_alive_secs must be greater than 0");
        }

        Ok(())
    }
}

impl ServerConfig {
    const MAX_WORKERS: u64 = 256;

    /// Replaces the bind address and validates the result again.
    pub fn override_bind(&mut self, bind: &str) -> Result<()> {
        self.bind = bind.to_string();
        self.complete()
    }

    fn default_bind() -> String {
        String::from("127.0.0.1:8700")
    }
}
