//! Station configuration, read from TOML.
//!
//! Every field has a default, so an empty file (or none at all) is valid:
//!
//! ```toml
//! start_page = "musics"
//!
//! [catalog]
//! audio_dir = "musics"
//! image_dir = "images"
//!
//! [playback]
//! lifecycle = "rebuild"
//! recipe = "dry_fx_mix"
//! seed = 7
//!
//! [visualizer]
//! bars = 24
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::io::catalog::{DirectoryCatalog, DEFAULT_AUDIO_EXTENSIONS, DEFAULT_IMAGE_EXTENSIONS};
use crate::recipe::ChainRecipe;
use crate::session::{Lifecycle, SessionOptions};
use crate::site::Page;
use crate::visualizer::BarPolicy;
use crate::FFT_SIZE;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StationConfig {
    pub start_page: Page,
    pub catalog: CatalogConfig,
    pub blog: BlogConfig,
    pub playback: PlaybackConfig,
    pub visualizer: VisualizerConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    pub audio_dir: PathBuf,
    pub image_dir: PathBuf,
    pub audio_extensions: Vec<String>,
    pub image_extensions: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            audio_dir: PathBuf::from("musics"),
            image_dir: PathBuf::from("images"),
            audio_extensions: DEFAULT_AUDIO_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            image_extensions: DEFAULT_IMAGE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl CatalogConfig {
    pub fn provider(&self) -> DirectoryCatalog {
        DirectoryCatalog::new(&self.audio_dir, &self.image_dir)
            .with_audio_extensions(&self.audio_extensions)
            .with_image_extensions(&self.image_extensions)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlogConfig {
    pub path: PathBuf,
}

impl Default for BlogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("blog.md"),
        }
    }
}

/// Built-in recipes selectable by name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipePreset {
    #[default]
    Chain,
    DryFxMix,
}

impl RecipePreset {
    pub fn recipe(self) -> ChainRecipe {
        match self {
            RecipePreset::Chain => ChainRecipe::default_chain(),
            RecipePreset::DryFxMix => ChainRecipe::dry_fx_mix(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlaybackConfig {
    pub lifecycle: Lifecycle,
    pub recipe: RecipePreset,
    /// Replaces the preset when present.
    pub custom_recipe: Option<ChainRecipe>,
    /// Fixed seed for reproducible chains.
    pub seed: Option<u64>,
    /// Output device by name; the host default when unset.
    pub device: Option<String>,
}

impl PlaybackConfig {
    pub fn effective_recipe(&self) -> ChainRecipe {
        self.custom_recipe
            .clone()
            .unwrap_or_else(|| self.recipe.recipe())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizerConfig {
    pub bars: usize,
    pub frame_rate: u32,
    #[serde(flatten)]
    pub policy: BarPolicy,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            bars: 16,
            frame_rate: 60,
            policy: BarPolicy::default(),
        }
    }
}

impl StationConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|error| ConfigError::Read {
            path: path.to_path_buf(),
            error,
        })?;
        Self::parse(&text, path)
    }

    /// Parse and validate `text`; `origin` is only used in errors.
    pub fn parse(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|error| ConfigError::Parse {
            path: origin.to_path_buf(),
            error,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.playback.effective_recipe().validate()?;

        if self.visualizer.bars == 0 {
            return Err(ConfigError::Invalid {
                field: "visualizer.bars",
                reason: "must be at least 1".into(),
            });
        }
        if !(1..=240).contains(&self.visualizer.frame_rate) {
            return Err(ConfigError::Invalid {
                field: "visualizer.frame_rate",
                reason: format!("{} outside 1..=240", self.visualizer.frame_rate),
            });
        }
        if self.visualizer.policy.scale < 0.0 || self.visualizer.policy.base < 0.0 {
            return Err(ConfigError::Invalid {
                field: "visualizer",
                reason: "base and scale must not be negative".into(),
            });
        }
        Ok(())
    }

    pub fn session_options(&self) -> SessionOptions {
        let options = SessionOptions::default()
            .recipe(self.playback.effective_recipe())
            .lifecycle(self.playback.lifecycle)
            .fft_size(FFT_SIZE);
        match self.playback.seed {
            Some(seed) => options.seed(seed),
            None => options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::RecipeStyle;

    fn parse(text: &str) -> Result<StationConfig, ConfigError> {
        StationConfig::parse(text, Path::new("station.toml"))
    }

    #[test]
    fn empty_file_is_default() {
        assert_eq!(parse("").unwrap(), StationConfig::default());
    }

    #[test]
    fn reads_sections() {
        let config = parse(
            r#"
            start_page = "blog"

            [catalog]
            audio_dir = "tracks"

            [playback]
            lifecycle = "rebuild"
            recipe = "dry_fx_mix"
            seed = 7
            device = "USB DAC"

            [visualizer]
            bars = 24
            scale = 12.0
            "#,
        )
        .unwrap();

        assert_eq!(config.start_page, Page::Blog);
        assert_eq!(config.catalog.audio_dir, PathBuf::from("tracks"));
        assert_eq!(config.catalog.image_dir, PathBuf::from("images"));
        assert_eq!(config.playback.lifecycle, Lifecycle::Rebuild);
        assert_eq!(config.playback.device.as_deref(), Some("USB DAC"));
        assert_eq!(config.visualizer.bars, 24);
        assert_eq!(config.visualizer.policy.scale, 12.0);
        assert_eq!(config.visualizer.policy.base, 3.0);

        let options = config.session_options();
        assert_eq!(options.seed, Some(7));
        assert_eq!(options.lifecycle, Lifecycle::Rebuild);
        assert!(matches!(options.recipe.style, RecipeStyle::DryFxMix { .. }));
    }

    #[test]
    fn custom_recipe_replaces_preset() {
        let config = parse(
            r#"
            [playback]
            recipe = "dry_fx_mix"

            [playback.custom_recipe]
            [[playback.custom_recipe.stages]]
            kind = "gain"
            probability = 1.0
            level = { min = 0.5, max = 0.5 }
            "#,
        )
        .unwrap();

        let recipe = config.playback.effective_recipe();
        assert_eq!(recipe.style, RecipeStyle::Chain);
        assert_eq!(recipe.stages.len(), 1);
    }

    #[test]
    fn invalid_custom_recipe_is_rejected() {
        let result = parse(
            r#"
            [playback.custom_recipe]
            [[playback.custom_recipe.stages]]
            kind = "bitcrusher"
            probability = 2.0
            steps = [4]
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Recipe(_))));
    }

    #[test]
    fn zero_bars_rejected() {
        assert!(matches!(
            parse("[visualizer]\nbars = 0"),
            Err(ConfigError::Invalid {
                field: "visualizer.bars",
                ..
            })
        ));
    }

    #[test]
    fn unknown_keys_are_parse_errors() {
        assert!(matches!(
            parse("[playback]\nloop = true"),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            StationConfig::load(&dir.path().join("station.toml")),
            Err(ConfigError::Read { .. })
        ));
        assert!(StationConfig::load_or_default(None).is_ok());
    }
}
