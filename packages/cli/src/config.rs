use anyhow::Context;
use breeze_evaluator::{RenderOptions, DEFAULT_MAX_DEPTH};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "breeze.config.json";

/// Breeze configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory of component definitions, one `<Name>.json` per component
    #[serde(default = "default_components_dir")]
    pub components_dir: String,

    /// Directory of page trees to render
    #[serde(default = "default_pages_dir")]
    pub pages_dir: String,

    /// Where rendered `.html` files go
    #[serde(default = "default_out_dir")]
    pub out_dir: String,

    /// Optional JSON file used as the render context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_file: Option<String>,

    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_components_dir() -> String {
    "components".to_string()
}

fn default_pages_dir() -> String {
    "pages".to_string()
}

fn default_out_dir() -> String {
    "dist".to_string()
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &Path) -> anyhow::Result<Self> {
        let config_path = cwd.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Invalid config in {}", config_path.display()))?;
            Ok(config)
        } else {
            // Return default config if none exists
            Ok(Config::default())
        }
    }

    pub fn components_dir(&self, cwd: &Path) -> PathBuf {
        cwd.join(&self.components_dir)
    }

    pub fn pages_dir(&self, cwd: &Path) -> PathBuf {
        cwd.join(&self.pages_dir)
    }

    pub fn out_dir(&self, cwd: &Path) -> PathBuf {
        cwd.join(&self.out_dir)
    }

    pub fn context_file(&self, cwd: &Path) -> Option<PathBuf> {
        self.context_file.as_ref().map(|file| cwd.join(file))
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            max_depth: self.max_depth,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            components_dir: default_components_dir(),
            pages_dir: default_pages_dir(),
            out_dir: default_out_dir(),
            context_file: None,
            max_depth: default_max_depth(),
        }
    }
}
