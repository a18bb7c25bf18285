// Combined configuration file for rollnetctl

use anyhow::{Context, Result};
use rollnet_agent::{AgentConfig, TrainerConfig};
use rollnet_link::SimConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything `rollnetctl run` needs, as read from one JSON file.
/// Sections and fields left out take their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub agent: AgentConfig,
    pub trainer: TrainerConfig,
    pub sim: SimConfig,
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.agent.validate()?;
        settings.sim.validate()?;
        Ok(settings)
    }
}
