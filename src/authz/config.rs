use std::collections::HashSet;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::CommonConfig;

/// A single (path, method) rule.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PathRule {
    pub path_name: String,

    pub method: String,

    /// For public and protected rules, `false` means the key is not enforced
    /// for this pair when the request carries none.
    #[serde(default)]
    pub enabled: bool,
}

/// Authorization related configuration
#[derive(Debug, Default, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct AuthorizationConfig {
    /// Paths that bypass key validation regardless of the headers.
    #[serde(default)]
    pub enable_paths: Vec<PathRule>,

    #[serde(default)]
    pub public_paths: Vec<PathRule>,

    #[serde(default)]
    pub protected_paths: Vec<PathRule>,
}

impl CommonConfig for AuthorizationConfig {
    fn complete(&mut self) -> Result<()> {
        complete_rules(&mut self.enable_paths).context("enable_paths")?;
        complete_rules(&mut self.public_paths).context("public_paths")?;
        complete_rules(&mut self.protected_paths).context("protected_paths")?;
        Ok(())
    }
}

impl PathRule {
    pub fn new(path_name: impl ToString, method: impl ToString, enabled: bool) -> Self {
        Self {
            path_name: path_name.to_string(),
            method: method.to_string(),
            enabled,
        }
    }
}

fn complete_rules(rules: &mut [PathRule]) -> Result<()> {
    let mut seen = HashSet::with_capacity(rules.len());
    for rule in rules.iter_mut() {
        if rule.path_name.is_empty() {
            bail!("path_name is required");
        }
        if !rule.path_name.starts_with('/') {
            bail!("path_name '{}' must start with '/'", rule.path_name);
        }

        rule.method = rule.method.trim().to_uppercase();
        if rule.method.is_empty() {
            bail!("method is required for path '{}'", rule.path_name);
        }

        if !seen.insert((rule.path_name.clone(), rule.method.clone())) {
            bail!(
                "duplicate rule for {} {}",
                rule.method,
                rule.path_name
            );
        }
    }
    Ok(())
}
