//! `fcsv` – inspect and convert Slicer fiducial files.
//!
//! Usage:
//!     fcsv show landmarks.fcsv --json
//!     fcsv convert old.fcsv new.fcsv --format extended
//!     fcsv distance landmarks.fcsv LE RE
//!     fcsv diff a.fcsv b.fcsv delta.fcsv

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use slicer_fiducials::{FiducialSet, Format};

#[derive(Parser)]
#[command(name = "fcsv")]
#[command(version)]
#[command(about = "Inspect and convert 3D Slicer fiducial files", long_about = None)]
struct Cli {
    /// Keep coordinates in RAS instead of converting to LPS
    #[arg(long, global = true)]
    no_flip: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every landmark in physical space
    Show {
        file: PathBuf,

        /// Print a JSON object of label -> [x, y, z]
        #[arg(long)]
        json: bool,
    },

    /// Rewrite a file in another layout
    Convert {
        input: PathBuf,
        output: PathBuf,

        /// Target layout: legacy or extended
        #[arg(short, long, value_parser = parse_format)]
        format: Format,
    },

    /// Euclidean distance between two landmarks
    Distance { file: PathBuf, a: String, b: String },

    /// Write the per-landmark difference a - b
    Diff {
        a: PathBuf,
        b: PathBuf,
        output: PathBuf,
    },
}

fn parse_format(s: &str) -> std::result::Result<Format, String> {
    s.parse::<Format>().map_err(|e| e.to_string())
}

fn load(path: &Path, flip: bool) -> Result<FiducialSet> {
    FiducialSet::builder()
        .path(path)
        .ras_to_lps(flip)
        .build()
        .with_context(|| format!("loading {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let flip = !cli.no_flip;

    match cli.command {
        Commands::Show { file, json } => {
            let set = load(&file, flip)?;
            if json {
                let map: BTreeMap<&str, [f64; 3]> =
                    set.iter().map(|(label, p)| (label, p.to_array())).collect();
                println!("{}", serde_json::to_string_pretty(&map)?);
            } else {
                print!("{set}");
            }
        }
        Commands::Convert {
            input,
            output,
            format,
        } => {
            let set = load(&input, flip)?;
            set.write(&output, Some(format))
                .with_context(|| format!("writing {}", output.display()))?;
        }
        Commands::Distance { file, a, b } => {
            let set = load(&file, flip)?;
            let d = set
                .distance(&a, &b)
                .with_context(|| format!("distance {a} -> {b}"))?;
            println!("{d:.3}");
        }
        Commands::Diff { a, b, output } => {
            let first = load(&a, flip)?;
            let second = load(&b, flip)?;
            let delta = FiducialSet::diff(&first, &second).context("computing difference")?;
            delta
                .write(&output, None)
                .with_context(|| format!("writing {}", output.display()))?;
        }
    }

    Ok(())
}
