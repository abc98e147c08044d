//! PDF annotator command line
//!
//! Inspect a PDF, convert coordinates between a rendered preview and PDF
//! points, or flatten a JSON annotation plan into a new PDF:
//!
//! ```text
//! annotator info contract.pdf
//! annotator map contract.pdf --preview-width 800 --preview-height 1035 100 100
//! annotator apply contract.pdf plan.json --output signed.pdf
//! ```

use std::path::PathBuf;

use annotator_core::Point;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod error;
mod plan;
#[cfg(test)]
mod tests;

use commands::{handle_apply, handle_info, handle_map, Direction};

/// Command-line arguments for the annotator
#[derive(Parser, Debug)]
#[command(name = "annotator")]
#[command(about = "Place text, erase and blur annotations on PDF pages")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a PDF and print its page sizes
    Info { input: PathBuf },

    /// Convert a point between preview pixels and PDF points
    Map {
        input: PathBuf,
        x: f64,
        y: f64,

        /// Zero-based page index
        #[arg(long, default_value = "0")]
        page: u32,

        /// Rendered preview width in pixels
        #[arg(long)]
        preview_width: f64,

        /// Rendered preview height in pixels
        #[arg(long)]
        preview_height: f64,

        /// Treat (x, y) as PDF points and convert back to preview pixels
        #[arg(long)]
        to_preview: bool,
    },

    /// Apply a JSON annotation plan and write the flattened PDF
    Apply {
        input: PathBuf,
        plan: PathBuf,

        /// Output file (defaults to edited_pdf.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Editor config JSON (capabilities, default styles, export colors)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Preview width for pages the plan does not measure
        #[arg(long, requires = "preview_height")]
        preview_width: Option<f64>,

        /// Preview height for pages the plan does not measure
        #[arg(long, requires = "preview_width")]
        preview_height: Option<f64>,
    },
}

fn print_json<T: Serialize>(report: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match args.command {
        Command::Info { input } => print_json(&handle_info(&input)?),
        Command::Map {
            input,
            x,
            y,
            page,
            preview_width,
            preview_height,
            to_preview,
        } => {
            let direction = if to_preview {
                Direction::ToPreview
            } else {
                Direction::ToDocument
            };
            print_json(&handle_map(
                &input,
                page,
                (preview_width, preview_height),
                Point::new(x, y),
                direction,
            )?)
        }
        Command::Apply {
            input,
            plan,
            output,
            config,
            preview_width,
            preview_height,
        } => {
            let fallback_preview = preview_width.zip(preview_height);
            print_json(&handle_apply(
                &input,
                &plan,
                output.as_deref(),
                config.as_deref(),
                fallback_preview,
            )?)
        }
    }
}
