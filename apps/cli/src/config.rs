//! TOML configuration: global settings plus per-deck overrides.
//!
//! ```toml
//! [settings]
//! lapse_policy = "halve"
//! batch_size = 7
//!
//! [decks."biology"]
//! choice_count = 4
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flashcard_core::{DeckSettings, EffectiveSettings, GlobalSettings};
use serde::{Deserialize, Serialize};

const CONFIG_DIR_NAME: &str = "flashcard-study";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    pub settings: GlobalSettings,
    /// Overrides keyed by deck file stem.
    pub decks: BTreeMap<String, DeckSettings>,
}

impl StudyConfig {
    /// Load `explicit` if given (it must exist), else the user config file
    /// if there is one, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match Self::user_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => {
                tracing::debug!("No config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = Self::from_toml(&contents)
            .with_context(|| format!("invalid config {}", path.display()))?;
        tracing::debug!(path = %path.display(), decks = config.decks.len(), "Loaded config");
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        if config.settings.fuzzy_almost_threshold > config.settings.fuzzy_correct_threshold {
            tracing::warn!(
                almost = config.settings.fuzzy_almost_threshold,
                correct = config.settings.fuzzy_correct_threshold,
                "Almost threshold is above the correct threshold; no answer will be \"almost\""
            );
        }
        Ok(config)
    }

    /// Platform config path, e.g. `~/.config/flashcard-study/config.toml`.
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn deck_settings(&self, deck_path: &Path) -> Option<&DeckSettings> {
        let stem = deck_path.file_stem()?.to_str()?;
        self.decks.get(stem)
    }

    /// Settings for a session on `deck_path`.
    pub fn effective_for(&self, deck_path: &Path) -> EffectiveSettings {
        EffectiveSettings::merge(&self.settings, self.deck_settings(deck_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashcard_core::LapsePolicy;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn empty_file_gives_defaults() {
        let config = StudyConfig::from_toml("").unwrap();
        assert_eq!(config, StudyConfig::default());
        assert_eq!(
            config.effective_for(Path::new("deck.csv")),
            EffectiveSettings::default()
        );
    }

    #[test]
    fn deck_overrides_apply_by_stem() {
        let config = StudyConfig::from_toml(
            r#"
            [settings]
            lapse_policy = "reset"
            batch_size = 5

            [decks."biology"]
            batch_size = 3
            choice_count = 4
            "#,
        )
        .unwrap();

        let biology = config.effective_for(Path::new("decks/biology.csv"));
        assert_eq!(biology.lapse_policy, LapsePolicy::Reset);
        assert_eq!(biology.batch_size, 3);
        assert_eq!(biology.choice_count, 4);

        let other = config.effective_for(Path::new("decks/chemistry.csv"));
        assert_eq!(other.batch_size, 5);
        assert_eq!(other.choice_count, 5);
    }

    #[test]
    fn unknown_lapse_policy_is_rejected() {
        let err = StudyConfig::from_toml("[settings]\nlapse_policy = \"forget\"\n");
        assert!(err.is_err());
    }

    #[test]
    fn explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(StudyConfig::load(Some(&missing)).is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[settings]\nhardest_count = 4").unwrap();
        let config = StudyConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.settings.hardest_count, 4);
    }
}
