use crate::constants::tag;
use crate::engine::{DisabledFeatures, EngineKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base image flavor when neither the command line nor the project sets one
    pub default_flavor: Option<String>,

    /// Image name when neither the command line nor the project sets one
    #[serde(default = "default_image_name")]
    pub default_image_name: String,

    /// Only use engine features every engine supports
    #[serde(default)]
    pub portable: bool,

    /// Only consider this engine during detection
    pub engine: Option<EngineKind>,
}

fn default_image_name() -> String {
    tag::DEFAULT_IMAGE_NAME.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_flavor: None,
            default_image_name: default_image_name(),
            portable: false,
            engine: None,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        if let Some(config_path) = Self::path() {
            if config_path.exists() {
                let content = std::fs::read_to_string(config_path)?;
                let config: Config = toml::from_str(&content)?;
                return Ok(config);
            }
        }
        Ok(Config::default())
    }

    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("build-image").join("config.toml"))
    }

    pub fn disabled_features(&self) -> DisabledFeatures {
        if self.portable {
            DisabledFeatures::portable()
        } else {
            DisabledFeatures::none()
        }
    }
}
