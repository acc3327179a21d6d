//! Merge somalier `relate` pair results into a run report.
//!
//! `somalier relate` writes a `.pairs.tsv` with one row per pair of samples.
//! The columns used here are the two sample ids (0 and 1), the relatedness
//! fraction (2) and the number of sites both samples were genotyped at
//! (13). Each pair at or above the relatedness threshold is expanded into
//! two directed matches, so that it is recorded under both samples.

use std::fmt::Debug;
use std::io::Read;
use std::num::{ParseFloatError, ParseIntError};
use std::path::Path;

use anyhow::Context;
use csv::ReaderBuilder;
use thiserror::Error;
use tracing::{debug, info};

use crate::report::{GenotypeMatches, MatchRecord, RunReport};
use crate::sample_id::CompositeId;
use crate::utils;

pub const DEFAULT_MIN_RELATEDNESS: f64 = 0.8;
pub const SOMALIER_MIN_COLUMNS: usize = 14;

const SAMPLE_A_COLUMN: usize = 0;
const SAMPLE_B_COLUMN: usize = 1;
const RELATEDNESS_COLUMN: usize = 2;
const N_SITES_COLUMN: usize = 13;

#[derive(Debug, Error)]
pub enum SomalierError {
    #[error("malformed TSV")]
    Csv(#[from] csv::Error),
    #[error(
        "line {line}: expected at least {} tab-delimited columns, found {found}",
        SOMALIER_MIN_COLUMNS
    )]
    TooFewColumns { line: u64, found: usize },
    #[error("line {line}: invalid relatedness {value:?}")]
    InvalidRelatedness {
        line: u64,
        value: String,
        #[source]
        source: ParseFloatError,
    },
    #[error("line {line}: invalid site count {value:?}")]
    InvalidSiteCount {
        line: u64,
        value: String,
        #[source]
        source: ParseIntError,
    },
}

/// One direction of a related pair: `target` was genotyped as matching
/// `source`.
#[derive(Debug, Clone, PartialEq)]
pub struct GenotypeMatch {
    pub source: String,
    pub target: String,
    /// Fraction in [0, 1]
    pub relatedness: f64,
    pub n_sites: u64,
}

impl GenotypeMatch {
    pub fn to_record(&self) -> MatchRecord {
        MatchRecord::new(&self.target, self.relatedness, self.n_sites)
    }
}

/// Read a somalier pairs table and keep the pairs whose relatedness is at
/// least `min_relatedness`, each expanded into both directions. The header
/// row is skipped.
pub fn parse_pairs<R: Read>(
    rdr: R,
    min_relatedness: f64,
) -> Result<Vec<GenotypeMatch>, SomalierError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_reader(rdr);

    let mut matches = Vec::new();
    let mut n_rows = 0;

    for rec in reader.records() {
        let rec = rec?;
        let line = rec.position().map_or(0, |p| p.line());
        n_rows += 1;

        if rec.len() < SOMALIER_MIN_COLUMNS {
            return Err(SomalierError::TooFewColumns {
                line,
                found: rec.len(),
            });
        }

        let raw = &rec[RELATEDNESS_COLUMN];
        let relatedness: f64 = raw
            .trim()
            .parse()
            .map_err(|source| SomalierError::InvalidRelatedness {
                line,
                value: raw.to_string(),
                source,
            })?;

        if relatedness.is_nan() || relatedness < min_relatedness {
            continue;
        }

        let raw = &rec[N_SITES_COLUMN];
        let n_sites: u64 = raw
            .trim()
            .parse()
            .map_err(|source| SomalierError::InvalidSiteCount {
                line,
                value: raw.to_string(),
                source,
            })?;

        let a = &rec[SAMPLE_A_COLUMN];
        let b = &rec[SAMPLE_B_COLUMN];

        matches.push(GenotypeMatch {
            source: a.to_string(),
            target: b.to_string(),
            relatedness,
            n_sites,
        });
        matches.push(GenotypeMatch {
            source: b.to_string(),
            target: a.to_string(),
            relatedness,
            n_sites,
        });
    }

    debug!(
        "{} of {} somalier pairs at or above relatedness {}",
        matches.len() / 2,
        n_rows,
        min_relatedness
    );
    Ok(matches)
}

/// How a report sample key is compared with the source id of a match.
///
/// Report keys are chip labels (`<sample_name>_<biosample_id>`), somalier
/// ids are usually prefixed with the plate barcode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum IdMatch {
    /// Drop the first segment of the report key and compare with the
    /// source id as is.
    #[default]
    StripKeyPrefix,
    /// Drop the first segment of the source id (the plate barcode) and
    /// compare with the report key as is.
    StripPairPrefix,
    /// Compare report key and source id directly.
    Exact,
}

impl IdMatch {
    pub fn matches(&self, sample_key: &str, source_id: &str) -> bool {
        match self {
            IdMatch::StripKeyPrefix => {
                CompositeId::new(sample_key).without_first_segment() == source_id
            }
            IdMatch::StripPairPrefix => {
                CompositeId::new(source_id).without_first_segment() == sample_key
            }
            IdMatch::Exact => sample_key == source_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeConfig {
    pub min_relatedness: f64,
    pub id_match: IdMatch,
}

impl Default for MergeConfig {
    fn default() -> Self {
        MergeConfig {
            min_relatedness: DEFAULT_MIN_RELATEDNESS,
            id_match: IdMatch::default(),
        }
    }
}

/// Set `genotype_matches` of every sample in `report` from `matches`.
/// Samples without a match get `None`, replacing whatever was there.
/// Returns the number of samples that received at least one match.
pub fn merge_matches(
    report: &mut RunReport,
    matches: &[GenotypeMatch],
    id_match: IdMatch,
) -> usize {
    let mut n_matched = 0;

    for (key, sample) in report.samples.iter_mut() {
        let mut found = GenotypeMatches::new();
        for m in matches.iter().filter(|m| id_match.matches(key, &m.source)) {
            found.insert(m.target.clone(), m.to_record());
        }

        sample.genotype_matches = if found.is_empty() {
            None
        } else {
            n_matched += 1;
            Some(found)
        };
    }

    n_matched
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The report was rewritten.
    Updated { pairs: usize, samples_matched: usize },
    /// No pair passed the threshold and the report was left alone.
    NoQualifyingPairs,
}

/// Merge the somalier pairs in `somalier_file` into the report at
/// `json_file`, rewriting it in full. The report is not touched when no
/// pair passes the threshold, or when anything fails to parse.
pub fn update_report<P: AsRef<Path> + Debug, Q: AsRef<Path> + Debug>(
    json_file: P,
    somalier_file: Q,
    config: &MergeConfig,
) -> Result<MergeOutcome, anyhow::Error> {
    let mut report = RunReport::read(&json_file)?;

    let rdr = utils::open_with_gz(&somalier_file)?;
    let matches = parse_pairs(rdr, config.min_relatedness)
        .with_context(|| format!("couldn't parse somalier pairs file {:?}", somalier_file))?;

    if matches.is_empty() {
        return Ok(MergeOutcome::NoQualifyingPairs);
    }

    let samples_matched = merge_matches(&mut report, &matches, config.id_match);
    report.write(&json_file)?;

    info!(
        "{} of {} samples in {:?} have genotype matches",
        samples_matched,
        report.samples.len(),
        json_file
    );
    Ok(MergeOutcome::Updated {
        pairs: matches.len() / 2,
        samples_matched,
    })
}
