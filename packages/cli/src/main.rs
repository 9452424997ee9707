mod commands;
mod config;

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{build, render, BuildArgs, RenderArgs};

/// Breeze CLI - render JSON component trees to HTML
#[derive(Parser, Debug)]
#[command(name = "breeze")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single page tree to HTML
    Render(RenderArgs),

    /// Render every page of a project into its output directory
    Build(BuildArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match std::env::current_dir() {
        Ok(cwd) => match cli.command {
            Command::Render(args) => render(args, &cwd).await,
            Command::Build(args) => build(args, &cwd).await.and_then(|summary| {
                if summary.failed == 0 {
                    Ok(())
                } else {
                    Err(anyhow!("{} page(s) failed to render", summary.failed))
                }
            }),
        },
        Err(err) => Err(anyhow!("Cannot get current directory: {}", err)),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
