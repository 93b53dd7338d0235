use std::path::{Path, PathBuf};
use std::{env, fs, io};

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::authz::config::AuthorizationConfig;
use crate::gateway::config::GatewayConfig;
use crate::logs::config::LogsConfig;
use crate::server::config::ServerConfig;

/// Environment variable overriding the admin API port.
pub const PORT_OVERRIDE_ENV: &str = "KONG_PORT";

pub const CONFIG_PATH_ENV: &str = "KONGGATE_CONFIG";

pub trait CommonConfig {
    fn complete(&mut self) -> Result<()>;
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub authorization: AuthorizationConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logs: LogsConfig,
}

impl CommonConfig for Config {
    fn complete(&mut self) -> Result<()> {
        self.gateway.complete().context("gateway")?;
        self.authorization.complete().context("authorization")?;
        self.server.complete().context("server")?;
        self.logs.complete().context("logs")?;
        Ok(())
    }
}

impl Config {
    pub fn parse(toml_str: &str, port_override: Option<String>) -> Result<Self> {
        let mut cfg: Config = toml::from_str(toml_str).context("parse config toml")?;
        cfg.apply_port_override(port_override)?;
        cfg.complete().context("validate config")?;
        Ok(cfg)
    }

    pub fn apply_port_override(&mut self, port: Option<String>) -> Result<()> {
        let Some(port) = port else {
            return Ok(());
        };
        let port = port.trim();
        if port.is_empty() {
            return Ok(());
        }

        self.gateway.port = match port.parse() {
            Ok(port) => port,
            Err(_) => bail!("invalid {PORT_OVERRIDE_ENV} value '{port}'"),
        };
        Ok(())
    }
}

/// Where the effective config came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// The file does not exist, defaults were used.
    Defaults(PathBuf),
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// The config file path, default is `~/.config/konggate.toml`.
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

impl ConfigArgs {
    /// Loads the config. Runs before logging is set up, callers report the
    /// returned source once the logger is ready.
    pub fn load(&self) -> Result<(Config, ConfigSource)> {
        load_dotenv(None)?;

        let path = self.get_path()?;
        let port_override = env::var(PORT_OVERRIDE_ENV).ok();

        match fs::read_to_string(&path) {
            Ok(s) => {
                let cfg = Config::parse(&s, port_override)
                    .with_context(|| format!("load config file '{}'", path.display()))?;
                Ok((cfg, ConfigSource::File(path)))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                let mut cfg = Config::default();
                cfg.apply_port_override(port_override)?;
                cfg.complete().context("validate default config")?;
                Ok((cfg, ConfigSource::Defaults(path)))
            }
            Err(err) => Err(err).with_context(|| format!("read config file '{}'", path.display())),
        }
    }

    fn get_path(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.config {
            return Ok(path.clone());
        }
        if let Ok(path) = env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let home = env::var_os("HOME")
            .or_else(|| env::var_os("USERPROFILE"))
            .map(PathBuf::from);
        match home {
            Some(home) => Ok(home.join(".config").join("konggate.toml")),
            None => {
                bail!("could not determine home directory, please specify config path manually")
            }
        }
    }
}

/// Loads a `.env` file into the environment, `None` means the one in the
/// working directory. A missing file is fine, a malformed one is an error.
pub fn load_dotenv(path: Option<&Path>) -> Result<()> {
    let result = match path {
        Some(path) => dotenvy::from_path(path),
        None => dotenvy::dotenv().map(|_| ()),
    };
    match result {
        Ok(()) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(err).context("load .env"),
    }
}

/// See: [`shellexpand::full`].
pub fn expandenv(name: &str, s: impl AsRef<str>) -> Result<String> {
    let s =
        shellexpand::full(s.as_ref()).with_context(|| format!("expand env value for '{name}'"))?;
    Ok(s.to_string())
}
