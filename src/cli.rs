use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use visual_check::VisualActionType;
use visualcheck_core_types::Rect;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// Enable debug mode
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Store the image as the new baseline
    Establish(CheckArgs),

    /// Pass when the image matches the baseline
    Compare(CheckArgs),

    /// Pass when the image differs from the baseline
    CheckInequality(CheckArgs),
}

impl Commands {
    pub fn action(&self) -> VisualActionType {
        match self {
            Commands::Establish(_) => VisualActionType::Establish,
            Commands::Compare(_) => VisualActionType::CompareAgainst,
            Commands::CheckInequality(_) => VisualActionType::CheckInequalityAgainst,
        }
    }

    pub fn args(&self) -> &CheckArgs {
        match self {
            Commands::Establish(args) | Commands::Compare(args) | Commands::CheckInequality(args) => {
                args
            }
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Baseline name
    #[arg(long)]
    pub baseline: String,

    /// Captured PNG; repeat for full-page tiles, top to bottom
    #[arg(long, value_name = "PNG", required = true)]
    pub image: Vec<PathBuf>,

    /// Area to ignore as x,y,width,height (page coordinates)
    #[arg(long, value_name = "RECT")]
    pub area: Vec<Rect>,

    /// Acceptable (compare) or required (check-inequality) diff percentage
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub diff_percentage: Option<u8>,

    /// Device pixel ratio of the captured images
    #[arg(long)]
    pub dpr: Option<f64>,

    #[arg(long)]
    pub header_cut: Option<u32>,

    #[arg(long)]
    pub footer_cut: Option<u32>,

    /// Capture strategy name (viewport, full_page)
    #[arg(long)]
    pub strategy: Option<String>,

    /// Baseline directory, overrides the configuration
    #[arg(long, value_name = "DIR")]
    pub baseline_dir: Option<PathBuf>,

    /// Write the diff markup PNG here
    #[arg(long, value_name = "PNG")]
    pub diff_out: Option<PathBuf>,

    /// Write the JSON report here
    #[arg(long, value_name = "FILE")]
    pub report_out: Option<PathBuf>,
}
