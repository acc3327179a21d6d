//! Add somalier genotype matches to an existing run report JSON.

use std::path::PathBuf;

use anyhow::{ensure, Error};
use clap::Parser;

use fluidigm_report::somalier::DEFAULT_MIN_RELATEDNESS;
use fluidigm_report::{init_logging, update_report, IdMatch, MergeConfig, MergeOutcome};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Read somalier relate pairs, keep pairs above the relatedness threshold and record them in the run report JSON",
    arg_required_else_help = true
)]
struct Cli {
    /// JSON file to be updated
    #[arg(short = 'j', long = "json_file", value_name = "FILE")]
    json_file: PathBuf,

    /// Somalier pairs file to be parsed (optionally gzipped)
    #[arg(short = 's', long = "somalier_file", value_name = "FILE")]
    somalier_file: PathBuf,

    /// Minimum relatedness for a pair to count as a genotype match
    #[arg(long, default_value_t = DEFAULT_MIN_RELATEDNESS, value_parser = parse_fraction)]
    min_relatedness: f64,

    /// How report sample keys are compared with somalier sample ids
    #[arg(long, value_enum, default_value_t = IdMatch::StripKeyPrefix)]
    id_match: IdMatch,

    /// Logging verbosity (e.g. error, warn, info, debug)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn parse_fraction(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if (0.0..=1.0).contains(&v) {
        Ok(v)
    } else {
        Err(format!("{} is not in [0, 1]", v))
    }
}

fn main() -> Result<(), Error> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    ensure!(
        cli.json_file.exists(),
        "JSON report file not found: {}",
        cli.json_file.display()
    );
    ensure!(
        cli.somalier_file.exists(),
        "Somalier relate pairs file not found: {}",
        cli.somalier_file.display()
    );

    let config = MergeConfig {
        min_relatedness: cli.min_relatedness,
        id_match: cli.id_match,
    };

    match update_report(&cli.json_file, &cli.somalier_file, &config)? {
        MergeOutcome::Updated { .. } => println!(
            "Updated {} with genotype matches from {}",
            cli.json_file.display(),
            cli.somalier_file.display()
        ),
        MergeOutcome::NoQualifyingPairs => println!(
            "No samples in {} matched, no updates to {} required.",
            cli.somalier_file.display(),
            cli.json_file.display()
        ),
    }
    Ok(())
}
