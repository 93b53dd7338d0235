use std::collections::HashMap;

use anyhow::{bail, Result};

use super::config::{AuthorizationConfig, PathRule};

/// Rules of one list, indexed by path then method.
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: HashMap<String, HashMap<String, bool>>,
}

impl RuleSet {
    pub fn new(rules: &[PathRule]) -> Result<Self> {
        let mut set = Self::default();
        for rule in rules {
            let methods = set.rules.entry(rule.path_name.clone()).or_default();
            let method = rule.method.to_uppercase();
            if methods.contains_key(&method) {
                bail!("duplicate rule for {} {}", method, rule.path_name);
            }
            methods.insert(method, rule.enabled);
        }
        Ok(set)
    }

    /// Returns the `enabled` flag of the matching rule, `None` if no rule
    /// matches. `method` must be upper case.
    pub fn lookup(&self, path: &str, method: &str) -> Option<bool> {
        self.rules.get(path)?.get(method).copied()
    }
}

/// The three compiled rule lists. Immutable once built.
#[derive(Debug, Default)]
pub struct PolicyStore {
    enable: RuleSet,
    public: RuleSet,
    protected: RuleSet,
}

impl PolicyStore {
    pub fn new(cfg: &AuthorizationConfig) -> Result<Self> {
        Ok(Self {
            enable: RuleSet::new(&cfg.enable_paths)?,
            public: RuleSet::new(&cfg.public_paths)?,
            protected: RuleSet::new(&cfg.protected_paths)?,
        })
    }

    pub fn enable_paths(&self) -> &RuleSet {
        &self.enable
    }

    pub fn public_paths(&self) -> &RuleSet {
        &self.public
    }

    pub fn protected_paths(&self) -> &RuleSet {
        &self.protected
    }
}
