use super::{find_json_files, load_context, load_page, load_registry, site_renderer};
use crate::config::Config;
use anyhow::{anyhow, Result};
use breeze_evaluator::{Renderer, Value};
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Args)]
pub struct BuildArgs {
    /// Project directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: String,

    /// Output directory (overrides config)
    #[arg(short, long)]
    pub out_dir: Option<String>,
}

/// Pages written and pages that failed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub rendered: usize,
    pub failed: usize,
}

pub async fn build(args: BuildArgs, cwd: &Path) -> Result<BuildSummary> {
    let root = cwd.join(&args.path);
    let mut config = Config::load(&root)?;
    if let Some(out_dir) = args.out_dir {
        config.out_dir = out_dir;
    }

    let pages_dir = config.pages_dir(&root);
    if !pages_dir.exists() {
        return Err(anyhow!("Pages directory does not exist: {:?}", pages_dir));
    }

    println!("{}", "🔨 Building pages...".bright_blue().bold());

    let registry = load_registry(&config.components_dir(&root))?;
    let context_path = config.context_file(&root);
    let context = load_context(context_path.as_deref())?;
    info!(components = registry.len(), "Loaded components");

    let pages = find_json_files(&pages_dir);
    if pages.is_empty() {
        println!("{}", "⚠️  No pages found".yellow());
        return Ok(BuildSummary::default());
    }

    println!("Found {} pages", pages.len());

    let renderer = site_renderer(registry, context, config.render_options());
    let out_dir = config.out_dir(&root);
    let mut summary = BuildSummary::default();

    // a failing page is reported and the rest still build
    for page in &pages {
        let relative_path = page.strip_prefix(&pages_dir).unwrap_or(page);

        // mirror the page's location so nested pages never collide
        let output_file = out_dir.join(relative_path).with_extension("html");

        match build_page(&renderer, page, &output_file).await {
            Ok(output_path) => {
                summary.rendered += 1;
                println!(
                    "  {} {} → {}",
                    "✓".green(),
                    relative_path.display(),
                    output_path.display()
                );
            }
            Err(e) => {
                summary.failed += 1;
                warn!(page = %relative_path.display(), error = %e, "Page failed");
                eprintln!(
                    "  {} {} - {}",
                    "✗".red(),
                    relative_path.display(),
                    e.to_string().red()
                );
            }
        }
    }

    println!();
    if summary.failed == 0 {
        println!("{} Built {} pages successfully", "✅".green(), summary.rendered);
    } else {
        println!(
            "{} Built {} pages, {} errors",
            "⚠️".yellow(),
            summary.rendered,
            summary.failed
        );
    }

    Ok(summary)
}

async fn build_page(renderer: &Renderer, page: &Path, output_file: &Path) -> Result<PathBuf> {
    let unit = load_page(page)?;
    let html = renderer.render(&unit, Value::Null).await?;

    if let Some(parent) = output_file.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(output_file, html)?;

    Ok(output_file.to_path_buf())
}
