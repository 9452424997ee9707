pub mod build;
pub mod render;

pub use build::{build, BuildArgs};
pub use render::{render, RenderArgs};

use anyhow::{bail, Context, Result};
use breeze_evaluator::{
    default_extensions, Registry, RenderOptions, Renderer, Unit, Utilities, Value,
};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

/// All `.json` files under `dir`, sorted so output is stable.
fn find_json_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|entry| entry.into_path())
        .filter(|path| path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("json"))
        .collect()
}

fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .with_context(|| format!("Invalid file name: {}", path.display()))
}

/// Every `<Name>.json` under `dir` becomes registry entry `Name`. A missing directory
/// is an empty registry. Two files with the same stem are an error.
pub(crate) fn load_registry(dir: &Path) -> Result<Registry> {
    let mut registry = Registry::new();
    let mut sources: HashMap<String, PathBuf> = HashMap::new();

    if !dir.exists() {
        debug!(dir = %dir.display(), "No components directory");
        return Ok(registry);
    }

    for path in find_json_files(dir) {
        let name = file_stem(&path)?;
        if let Some(existing) = sources.get(&name) {
            bail!(
                "Duplicate component '{}' in {} and {}",
                name,
                existing.display(),
                path.display()
            );
        }
        let unit: Unit = load_json(&path)?;
        sources.insert(name.clone(), path.clone());
        debug!(component = %name, "Loaded component");
        registry.insert(name, unit);
    }

    Ok(registry)
}

pub(crate) fn load_context(path: Option<&Path>) -> Result<Value> {
    match path {
        Some(path) => load_json(path),
        None => Ok(Value::object()),
    }
}

pub(crate) fn load_page(path: &Path) -> Result<Unit> {
    load_json(path)
}

/// Renderer with the canonical extensions and the built-in utilities.
pub(crate) fn site_renderer(registry: Registry, context: Value, options: RenderOptions) -> Renderer {
    Renderer::builder()
        .components(registry)
        .extensions(default_extensions())
        .utilities(Utilities::with_defaults())
        .context(context)
        .options(options)
        .build()
}
