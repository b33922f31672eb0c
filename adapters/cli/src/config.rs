//! TOML configuration for the command-line adapter.

use std::{collections::BTreeMap, fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use flipboard_core::EngineConfig;
use serde::{Deserialize, Serialize};

/// Engine settings plus the prompt deck, as read from `--config`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct CliConfig {
    #[serde(flatten)]
    pub(crate) engine: EngineConfig,
    pub(crate) prompts: PromptSettings,
}

/// Prompt rotation settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct PromptSettings {
    /// Minimum milliseconds between two prompt changes.
    pub(crate) rotation_cooldown_ms: u64,
    /// Category drawn from; every category when unset.
    pub(crate) category: Option<String>,
    /// Named prompt lists.
    pub(crate) categories: BTreeMap<String, Vec<String>>,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            rotation_cooldown_ms: 6_000,
            category: None,
            categories: BTreeMap::new(),
        }
    }
}

impl PromptSettings {
    pub(crate) const fn rotation_cooldown(&self) -> Duration {
        Duration::from_millis(self.rotation_cooldown_ms)
    }
}

/// Reads the configuration at `path`, or the defaults when no path is given.
pub(crate) fn load(path: Option<&Path>) -> Result<CliConfig> {
    let Some(path) = path else {
        return Ok(CliConfig::default());
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    parse(&contents).with_context(|| format!("failed to load config file {}", path.display()))
}

fn parse(contents: &str) -> Result<CliConfig> {
    let config: CliConfig = toml::from_str(contents).context("invalid TOML")?;
    config.engine.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_yields_defaults() {
        let config = load(None).expect("defaults");
        assert_eq!(config, CliConfig::default());
        assert_eq!(
            config.prompts.rotation_cooldown(),
            Duration::from_millis(6_000)
        );
    }

    #[test]
    fn engine_sections_sit_at_top_level() {
        let config = parse(
            r#"
            [reveal]
            frame_interval_ms = 20

            [audio]
            pool_size = 4

            [prompts]
            rotation_cooldown_ms = 1000
            category = "light"

            [prompts.categories]
            light = ["what made you smile today"]
            deep = ["what are you afraid to lose"]
            "#,
        )
        .expect("valid config");

        assert_eq!(config.engine.reveal.frame_interval_ms, 20);
        assert_eq!(config.engine.reveal.frames_per_word, 15);
        assert_eq!(config.engine.audio.pool_size, 4);
        assert_eq!(config.prompts.category.as_deref(), Some("light"));
        assert_eq!(config.prompts.categories.len(), 2);
    }

    #[test]
    fn invalid_engine_values_are_reported() {
        let error = parse("[hover]\nframes = 0\n").expect_err("zero frames");
        assert!(
            format!("{error:#}").contains("hover frames"),
            "unexpected error: {error:#}"
        );
    }

    #[test]
    fn unreadable_file_names_the_path() {
        let error = load(Some(Path::new("/nonexistent/flipboard.toml"))).expect_err("missing");
        assert!(error.to_string().contains("/nonexistent/flipboard.toml"));
    }
}
