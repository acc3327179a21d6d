//! Build the per-run QC report for a Fluidigm SNP-type chip, and merge
//! somalier genotype matches into it.
//!
//! The two steps run as separate processes and share nothing but the
//! report file `report.fluidigm.<barcode>.json`:
//!
//! 1. [`fluidigm::create_report`] reads the chip CSV export and writes the
//!    report skeleton, one record per non-control sample well.
//! 2. [`somalier::update_report`] reads a somalier `relate` pairs table and
//!    fills in `genotype_matches` for every sample with a close relative.

pub mod fluidigm;
pub mod report;
pub mod sample_id;
pub mod somalier;
pub mod utils;

pub use fluidigm::{create_report, ControlFilter, FluidigmRun};
pub use report::{MatchRecord, RunReport, SampleRecord};
pub use somalier::{update_report, IdMatch, MergeConfig, MergeOutcome};

use anyhow::Error;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the stderr log subscriber used by the binaries. `level` is an
/// `EnvFilter` directive such as `info` or `fluidigm_report=debug`.
pub fn init_logging(level: &str) -> Result<(), Error> {
    let filter = EnvFilter::try_new(level)?;
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
    Ok(())
}
