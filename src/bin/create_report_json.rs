//! Create the run report JSON for a Fluidigm SNP-type chip export.

use std::path::PathBuf;

use anyhow::{ensure, Error};
use clap::Parser;
use tracing::info;

use fluidigm_report::{create_report, init_logging, ControlFilter};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Read a Fluidigm SNP array CSV and create the run report JSON with sample positions and empty QC fields",
    arg_required_else_help = true
)]
struct Cli {
    /// Fluidigm file to be parsed (optionally gzipped)
    #[arg(short = 'f', long = "fluidigm_file", value_name = "FILE")]
    fluidigm_file: PathBuf,

    /// Directory where the report JSON will be written
    #[arg(short = 'o', long = "output_dir", value_name = "DIR")]
    output_dir: PathBuf,

    /// Which sample rows to test for the NTC control marker
    #[arg(long, value_enum, default_value_t = ControlFilter::PerRow)]
    control_filter: ControlFilter,

    /// Logging verbosity (e.g. error, warn, info, debug)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<(), Error> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    ensure!(
        cli.fluidigm_file.exists(),
        "Fluidigm SNP array file not found: {}",
        cli.fluidigm_file.display()
    );
    ensure!(
        cli.output_dir.is_dir(),
        "Output directory not found: {}",
        cli.output_dir.display()
    );

    let (json_file, report) =
        create_report(&cli.fluidigm_file, &cli.output_dir, cli.control_filter)?;
    info!("{} samples written", report.samples.len());

    println!(
        "Created report json {} for run {} from file {}.",
        json_file.display(),
        report.barcode,
        cli.fluidigm_file.display()
    );
    Ok(())
}
