use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tuning for one layout run. Two runs with equal configs and equal PD codes
/// produce the same diagram.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LayoutConfig {
    /// Seed of the first attempt; attempt `i` uses `seed + i`.
    pub seed: u64,
    pub max_tries: usize,
    /// Placement rebuilds allowed inside one attempt before it gives up.
    pub max_tree_rebuilds: usize,
    /// Coordinate spacing applied before each socket is routed.
    pub spread_factor: i32,
    /// Coordinate spacing applied after each socket is routed.
    pub compact_factor: i32,
    /// Empty cells added around the drawing's bounding box for the router.
    pub search_margin: i32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            max_tries: 100,
            max_tree_rebuilds: 64,
            spread_factor: 6,
            compact_factor: 2,
            search_margin: 5,
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_tries == 0 {
            anyhow::bail!("maxTries must be at least 1");
        }
        if self.spread_factor < 1 || self.compact_factor < 1 {
            anyhow::bail!(
                "spreadFactor and compactFactor must be at least 1 (got {} and {})",
                self.spread_factor,
                self.compact_factor
            );
        }
        if self.compact_factor >= self.spread_factor {
            anyhow::bail!(
                "spreadFactor ({}) must exceed compactFactor ({})",
                self.spread_factor,
                self.compact_factor
            );
        }
        if self.search_margin < 0 {
            anyhow::bail!("searchMargin must not be negative");
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    seed: Option<u64>,
    max_tries: Option<usize>,
    max_tree_rebuilds: Option<usize>,
    spread_factor: Option<i32>,
    compact_factor: Option<i32>,
    search_margin: Option<i32>,
}

fn apply_config_file(config: &mut LayoutConfig, parsed: ConfigFile) {
    if let Some(v) = parsed.seed {
        config.seed = v;
    }
    if let Some(v) = parsed.max_tries {
        config.max_tries = v;
    }
    if let Some(v) = parsed.max_tree_rebuilds {
        config.max_tree_rebuilds = v;
    }
    if let Some(v) = parsed.spread_factor {
        config.spread_factor = v;
    }
    if let Some(v) = parsed.compact_factor {
        config.compact_factor = v;
    }
    if let Some(v) = parsed.search_margin {
        config.search_margin = v;
    }
}

pub fn parse_config(contents: &str) -> anyhow::Result<LayoutConfig> {
    let mut config = LayoutConfig::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;
    apply_config_file(&mut config, parsed);
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<LayoutConfig> {
    let Some(path) = path else {
        return Ok(LayoutConfig::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = load_config(None).unwrap();
        assert_eq!(config, LayoutConfig::default());
        assert_eq!(config.seed, 42);
        config.validate().unwrap();
    }

    #[test]
    fn overlays_present_keys_only() {
        let config = parse_config(r#"{"seed": 7, "maxTries": 3}"#).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.max_tries, 3);
        assert_eq!(config.spread_factor, 6);
        assert_eq!(config.compact_factor, 2);
    }

    #[test]
    fn rejects_inverted_factors() {
        let err = parse_config(r#"{"spreadFactor": 2, "compactFactor": 2}"#).unwrap_err();
        assert!(err.to_string().contains("must exceed"));
        assert!(parse_config(r#"{"maxTries": 0}"#).is_err());
        assert!(parse_config(r#"{"searchMargin": -1}"#).is_err());
    }

    #[test]
    fn rejects_bad_json() {
        assert!(parse_config("{seed: }").is_err());
    }
}
