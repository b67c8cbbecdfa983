//! site-highlight CLI - highlight marked code blocks in static HTML pages.

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use miette::Result;
use owo_colors::OwoColorize;
use site_highlight::{ProcessOptions, Processor};
use tracing_subscriber::EnvFilter;

/// Highlight `build-js` code blocks in a directory of HTML pages.
///
/// Every `.html` file in INPUT is rewritten into OUTPUT under the same name.
/// Nothing is written if any file fails.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Directory containing the source pages
    #[arg(default_value = "source")]
    input: PathBuf,

    /// Directory receiving the highlighted pages (created if missing)
    #[arg(default_value = "docs")]
    output: PathBuf,

    /// Show per-file progress in the log
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    eprintln!(
        "{} {} -> {}",
        "site-highlight".green().bold(),
        args.input.display(),
        args.output.display()
    );

    let processor = Processor::new(ProcessOptions::new(args.input, args.output));

    let start = Instant::now();
    let stats = processor.process()?;
    let elapsed = start.elapsed();

    eprintln!("{}", "Results:".bold());
    eprintln!(
        "  {} HTML files processed",
        stats.files_processed.to_string().cyan()
    );
    eprintln!(
        "  {} code blocks highlighted",
        stats.blocks_highlighted.to_string().green()
    );
    if stats.files_skipped > 0 {
        eprintln!(
            "  {} other entries ignored",
            stats.files_skipped.to_string().yellow()
        );
    }
    eprintln!(
        "  HTML size {:+.1}% ({:.1} MB/s)",
        stats.html_inflation_percent(),
        stats.throughput_mb_s()
    );
    eprintln!("\n  Completed in {:.2}s", elapsed.as_secs_f64());

    Ok(())
}
