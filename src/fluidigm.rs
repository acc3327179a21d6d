//! Parse the CSV export of a Fluidigm SNP-type run and build the skeleton
//! run report from it.
//!
//! The export has no usable header. The chip barcode sits in the third
//! column of the first row, and one row per sample well follows from row 17
//! onwards:
//!
//! ```text
//! Chip Run Info,<path>,1381234567,...
//! ... 15 rows of run metadata ...
//! S01-A01,...,...,...,HG002_BS001,Unknown,...
//! S02-A01,...,...,...,NTC_0,NTC,...
//! ```

use std::fmt::Debug;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use csv::{ReaderBuilder, StringRecord};
use thiserror::Error;
use tracing::{debug, warn};

use crate::report::{report_file_name, RunReport, SampleRecord, Samples, INSTRUMENT};
use crate::utils;

pub const BARCODE_ROW: usize = 0;
pub const BARCODE_COLUMN: usize = 2;
pub const FIRST_SAMPLE_ROW: usize = 16;

const WELL_COLUMN: usize = 0;
const LABEL_COLUMN: usize = 4;
const MARKER_COLUMN: usize = 5;
const SAMPLE_MIN_COLUMNS: usize = MARKER_COLUMN + 1;

/// Marker of a no-template-control well.
pub const CONTROL_MARKER: &str = "NTC";

#[derive(Debug, Error)]
pub enum FluidigmError {
    #[error("malformed CSV")]
    Csv(#[from] csv::Error),
    #[error("expected at least {} rows, found {0}", FIRST_SAMPLE_ROW + 1)]
    TooFewRows(usize),
    #[error("line {line}: no chip barcode in column {}", BARCODE_COLUMN + 1)]
    MissingBarcode { line: u64 },
    #[error(
        "line {line}: expected at least {} columns in sample row, found {found}",
        SAMPLE_MIN_COLUMNS
    )]
    ShortSampleRow { line: u64, found: usize },
}

/// How control wells are excluded from the report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ControlFilter {
    /// Drop every sample row whose marker is `NTC`.
    #[default]
    PerRow,
    /// Test the marker of the final sample row only, dropping that row if
    /// it is a control and keeping every row before it. One reading of how
    /// older versions of the pipeline filtered controls.
    LastRow,
    /// Test the marker of the final sample row only, and keep or drop the
    /// whole sample block on it. The other reading of the older filter.
    AllOrNothing,
}

/// One sample well of the chip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChipSample {
    pub well: String,
    pub label: String,
    pub marker: String,
    /// 1-based line in the export
    pub line: u64,
}

impl ChipSample {
    pub fn is_control(&self) -> bool {
        self.marker == CONTROL_MARKER
    }

    fn from_record(rec: &StringRecord, line: u64) -> Result<ChipSample, FluidigmError> {
        if rec.len() < SAMPLE_MIN_COLUMNS {
            return Err(FluidigmError::ShortSampleRow {
                line,
                found: rec.len(),
            });
        }

        Ok(ChipSample {
            well: rec[WELL_COLUMN].to_string(),
            label: rec[LABEL_COLUMN].to_string(),
            marker: rec[MARKER_COLUMN].to_string(),
            line,
        })
    }
}

/// The parts of a Fluidigm export the report is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FluidigmRun {
    pub barcode: String,
    pub samples: Vec<ChipSample>,
}

impl FluidigmRun {
    pub fn from_path(path: impl AsRef<Path>) -> Result<FluidigmRun, anyhow::Error> {
        let path = path.as_ref();
        let rdr = utils::open_with_gz(path)?;
        let run = Self::from_reader(rdr)
            .with_context(|| format!("couldn't parse Fluidigm file {:?}", path))?;
        Ok(run)
    }

    pub fn from_reader<R: Read>(rdr: R) -> Result<FluidigmRun, FluidigmError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(rdr);

        // The reader skips blank lines, but they still count as rows of the
        // export. Row i sits on line i + 1; a skipped line leaves a `None`.
        let mut rows: Vec<Option<(StringRecord, u64)>> = Vec::new();
        for rec in reader.records() {
            let rec = rec?;
            let line = rec.position().map_or(rows.len() as u64 + 1, |p| p.line());
            let row = (line as usize).saturating_sub(1);
            if rows.len() < row {
                rows.resize(row, None);
            }
            rows.push(Some((rec, line)));
        }

        if rows.len() <= FIRST_SAMPLE_ROW {
            return Err(FluidigmError::TooFewRows(rows.len()));
        }

        let barcode_line = BARCODE_ROW as u64 + 1;
        let barcode = rows[BARCODE_ROW]
            .as_ref()
            .and_then(|(rec, _)| rec.get(BARCODE_COLUMN))
            .ok_or(FluidigmError::MissingBarcode { line: barcode_line })?
            .to_string();

        let samples = rows[FIRST_SAMPLE_ROW..]
            .iter()
            .enumerate()
            .map(|(i, row)| match row {
                Some((rec, line)) => ChipSample::from_record(rec, *line),
                None => Err(FluidigmError::ShortSampleRow {
                    line: (FIRST_SAMPLE_ROW + i) as u64 + 1,
                    found: 0,
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!("read {} sample rows for chip {}", samples.len(), barcode);
        Ok(FluidigmRun { barcode, samples })
    }

    /// The sample rows that make it into the report.
    pub fn reported_samples(&self, filter: ControlFilter) -> Vec<&ChipSample> {
        match filter {
            ControlFilter::PerRow => self.samples.iter().filter(|s| !s.is_control()).collect(),
            ControlFilter::LastRow => match self.samples.split_last() {
                Some((last, rest)) => {
                    let mut kept: Vec<_> = rest.iter().collect();
                    if !last.is_control() {
                        kept.push(last);
                    }
                    kept
                }
                None => Vec::new(),
            },
            ControlFilter::AllOrNothing => match self.samples.last() {
                Some(last) if !last.is_control() => self.samples.iter().collect(),
                _ => Vec::new(),
            },
        }
    }

    /// Build the skeleton report. Every sample starts with empty QC fields.
    pub fn to_report(&self, filter: ControlFilter) -> RunReport {
        let mut samples = Samples::new();

        for s in self.reported_samples(filter) {
            if !s.well.starts_with('S') {
                warn!("line {}: unexpected well label {:?}", s.line, s.well);
            }
            let rec = SampleRecord::from_chip(&s.label, &s.well);
            if samples.insert(s.label.clone(), rec).is_some() {
                warn!(
                    "line {}: duplicate sample label {}, keeping the later row",
                    s.line, s.label
                );
            }
        }

        debug!(
            "{} of {} sample rows reported with {:?} control filter",
            samples.len(),
            self.samples.len(),
            filter
        );
        RunReport::new(self.barcode.clone(), samples)
    }

    pub fn report_path(&self, output_dir: impl AsRef<Path>) -> PathBuf {
        output_dir.as_ref().join(report_file_name(INSTRUMENT, &self.barcode))
    }
}

/// Parse `fluidigm_file` and write its skeleton report into `output_dir`,
/// replacing any report already there. Returns the report and its path.
pub fn create_report<P: AsRef<Path> + Debug>(
    fluidigm_file: P,
    output_dir: impl AsRef<Path>,
    filter: ControlFilter,
) -> Result<(PathBuf, RunReport), anyhow::Error> {
    let run = FluidigmRun::from_path(&fluidigm_file)?;
    let report = run.to_report(filter);
    let path = run.report_path(output_dir);
    report.write(&path)?;
    Ok((path, report))
}
