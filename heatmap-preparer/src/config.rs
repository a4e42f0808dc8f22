use std::path::Path;

use anyhow::Context;
use heatgrid::HeatmapConfig;

/// Load a TOML config file. Missing sections and keys keep their defaults.
pub fn load_config(path: &Path) -> anyhow::Result<HeatmapConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    parse_config(&text).with_context(|| format!("parsing config file {}", path.display()))
}

pub fn parse_config(text: &str) -> Result<HeatmapConfig, toml::de::Error> {
    toml::from_str(text)
}

/// Config file if given, defaults otherwise.
pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<HeatmapConfig> {
    match path {
        Some(path) => load_config(path),
        None => Ok(HeatmapConfig::default()),
    }
}
