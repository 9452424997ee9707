use super::{load_context, load_page, load_registry, site_renderer};
use anyhow::Result;
use breeze_evaluator::{RenderOptions, Value};
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Page tree to render (JSON)
    pub page: PathBuf,

    /// Directory of component definitions
    #[arg(short, long)]
    pub components: Option<PathBuf>,

    /// JSON file used as the render context
    #[arg(long)]
    pub context: Option<PathBuf>,

    /// Write HTML to this file instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Nesting limit for components and children
    #[arg(long)]
    pub max_depth: Option<usize>,
}

pub async fn render(args: RenderArgs, cwd: &Path) -> Result<()> {
    let page = load_page(&cwd.join(&args.page))?;
    let registry = match &args.components {
        Some(dir) => load_registry(&cwd.join(dir))?,
        None => Default::default(),
    };
    let context_path = args.context.as_ref().map(|file| cwd.join(file));
    let context = load_context(context_path.as_deref())?;

    let mut options = RenderOptions::default();
    if let Some(max_depth) = args.max_depth {
        options.max_depth = max_depth;
    }

    let html = site_renderer(registry, context, options)
        .render(&page, Value::Null)
        .await?;

    match &args.out {
        Some(out) => {
            let out = cwd.join(out);
            if let Some(parent) = out.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&out, html)?;
            eprintln!("{} {} → {}", "✓".green(), args.page.display(), out.display());
        }
        None => println!("{}", html),
    }

    Ok(())
}
