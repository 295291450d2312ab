//! CLI command handlers

pub mod diff;
pub mod rules;
pub mod serve;

use anyhow::Context;
use inventory_differ::config::settings::ServiceSettings;
use inventory_differ::DiffEngine;
use std::path::{Path, PathBuf};

/// Settings and rules location shared by every command
pub struct CommandContext {
    pub settings: ServiceSettings,
    /// `--rules` if given, else the settings value, else the per-user default
    pub rules_path: Option<PathBuf>,
}

impl CommandContext {
    pub fn new(settings_path: Option<&Path>, rules_override: Option<PathBuf>) -> anyhow::Result<Self> {
        let settings = ServiceSettings::load(settings_path).context("failed to load settings")?;
        let rules_path = rules_override.or_else(|| settings.resolved_rules_path());
        Ok(Self {
            settings,
            rules_path,
        })
    }

    pub fn load_engine(&self) -> anyhow::Result<DiffEngine> {
        DiffEngine::new(self.rules_path.as_deref()).with_context(|| match &self.rules_path {
            Some(path) => format!("failed to load rules from {}", path.display()),
            None => "failed to load built-in rules".to_string(),
        })
    }
}

/// Read a snapshot file
pub fn read_payload(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read snapshot {}", path.display()))
}
