use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::{OwoColorize, Stream};
use tracing_subscriber::EnvFilter;

use crate::{
    cli::{Cli, Command},
    pipeline::RunSummary,
    provider::scholar::Scholar,
};

mod cli;
mod config;
mod pipeline;
mod provider;
mod record;
mod render;

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_tracing(args.verbose);

    match args.command {
        Command::Build {
            config,
            no_progress,
        } => {
            let cfg = config.load()?;
            let provider = Scholar::new(&cfg)?;
            let progress = progress_bar(no_progress)?;
            let summary = pipeline::run(&cfg, &provider, &progress)?;
            print_summary(&summary);
        }
        Command::Resolve { config } => {
            let cfg = config.load()?;
            let provider = Scholar::new(&cfg)?;
            let identities = pipeline::resolve_identities(&cfg, &provider)?;
            for (person, identity) in cfg.people.iter().zip(&identities) {
                println!("{person}\t{}\t{}", identity.id, identity.name);
            }
        }
        Command::Config { config } => {
            let cfg = config.load()?;
            println!("{}", serde_json::to_string_pretty(&cfg)?);
        }
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn progress_bar(hidden: bool) -> anyhow::Result<ProgressBar> {
    if hidden {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        )?
        .progress_chars("#>-"),
    );
    pb.set_message("publications");
    Ok(pb)
}

fn print_summary(summary: &RunSummary) {
    let ok = format!(
        "✓ {} records in {} files ({} listed for {} authors)",
        summary.stats.kept,
        summary.files.len(),
        summary.stubs,
        summary.identities.len()
    );
    let skipped = format!("✗ {} skipped", summary.stats.skipped());
    eprintln!(
        "{}  {}",
        ok.if_supports_color(Stream::Stderr, |t| t.green()),
        skipped.if_supports_color(Stream::Stderr, |t| t.red()),
    );
}
