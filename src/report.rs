//! The per-run QC report JSON shared by the report initializer and the
//! somalier match merger.
//!
//! The report is keyed by the composite sample label found on the chip.
//! Field order in the serialized document follows the declaration order
//! below, and unknown fields written by other pipeline steps are carried
//! through untouched.

use std::fmt::Debug;
use std::path::Path;

use anyhow::Error;
use indexmap::IndexMap;
use serde_derive::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::sample_id::{sample_position, CompositeId};
use crate::utils;

/// Instrument label written to every report.
pub const INSTRUMENT: &str = "fluidigm";

/// Samples of a run, in chip order, keyed by composite sample label.
pub type Samples = IndexMap<String, SampleRecord>;

/// Genotype matches of one sample, keyed by the matched somalier id.
pub type GenotypeMatches = IndexMap<String, MatchRecord>;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RunReport {
    pub barcode: String,
    pub instrument: String,
    pub samples: Samples,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SampleRecord {
    pub sample_name: String,
    pub biosample_id: String,
    pub sample_position: String,
    /// Filled in by downstream QC.
    pub passed: Option<Value>,
    /// Filled in by downstream QC.
    pub fluidigm_predicted_sex: Option<Value>,
    /// `None` until matches are merged, and stays `None` for a sample
    /// without any accepted match.
    pub genotype_matches: Option<GenotypeMatches>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A sample whose genotype concordance with the reported sample passed
/// the relatedness threshold.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MatchRecord {
    pub sample_name: String,
    pub biosample_id: String,
    pub plate_barcode: String,
    pub percent_match: f64,
    pub n_sites: u64,
}

impl RunReport {
    pub fn new(barcode: impl Into<String>, samples: Samples) -> RunReport {
        RunReport {
            barcode: barcode.into(),
            instrument: INSTRUMENT.to_string(),
            samples,
            extra: Map::new(),
        }
    }

    /// File name of the report for this run, `report.fluidigm.<barcode>.json`.
    pub fn file_name(&self) -> String {
        report_file_name(&self.instrument, &self.barcode)
    }

    pub fn read(path: impl AsRef<Path> + Debug) -> Result<RunReport, Error> {
        utils::read_json(path)
    }

    pub fn write(&self, path: impl AsRef<Path> + Debug) -> Result<(), Error> {
        utils::write_json(self, path)
    }
}

pub fn report_file_name(instrument: &str, barcode: &str) -> String {
    format!("report.{}.{}.json", instrument, barcode)
}

impl SampleRecord {
    /// A fresh record for the chip label `label` sitting in well `well`.
    pub fn from_chip(label: &str, well: &str) -> SampleRecord {
        let id = CompositeId::new(label);
        SampleRecord {
            sample_name: id.sample_name().to_string(),
            biosample_id: id.biosample_id().to_string(),
            sample_position: sample_position(well),
            passed: None,
            fluidigm_predicted_sex: None,
            genotype_matches: None,
            extra: Map::new(),
        }
    }
}

impl MatchRecord {
    /// Describe the matched somalier sample `matched_id`. `relatedness` is
    /// the somalier fraction in [0, 1].
    ///
    /// `sample_name` drops only the plate barcode, so `PLATE2_SAMP_B02`
    /// gives `SAMP_B02`. Reports written by the older Python tooling also
    /// dropped the biosample id there and hold `SAMP`.
    pub fn new(matched_id: &str, relatedness: f64, n_sites: u64) -> MatchRecord {
        let id = CompositeId::new(matched_id);
        MatchRecord {
            sample_name: id.without_first_segment(),
            biosample_id: id.biosample_id().to_string(),
            plate_barcode: id.plate_barcode().to_string(),
            percent_match: relatedness * 100.0,
            n_sites,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn one_sample_report() -> RunReport {
        let mut samples = Samples::new();
        samples.insert(
            "HG002_BS001".to_string(),
            SampleRecord::from_chip("HG002_BS001", "S01-A01"),
        );
        RunReport::new("1381234567", samples)
    }

    #[test]
    fn test_file_name() {
        assert_eq!(one_sample_report().file_name(), "report.fluidigm.1381234567.json");
    }

    #[test]
    fn test_serialized_layout() -> Result<(), Error> {
        let json = String::from_utf8(utils::to_json_bytes(&one_sample_report())?)?;
        let expected = r#"{
    "barcode": "1381234567",
    "instrument": "fluidigm",
    "samples": {
        "HG002_BS001": {
            "sample_name": "HG002",
            "biosample_id": "BS001",
            "sample_position": "01",
            "passed": null,
            "fluidigm_predicted_sex": null,
            "genotype_matches": null
        }
    }
}"#;
        assert_eq!(json, expected);
        Ok(())
    }

    #[test]
    fn test_match_record() {
        let m = MatchRecord::new("PLATE2_SAMP_B02", 0.95, 350);
        assert_eq!(
            m,
            MatchRecord {
                sample_name: "SAMP_B02".to_string(),
                biosample_id: "B02".to_string(),
                plate_barcode: "PLATE2".to_string(),
                percent_match: 95.0,
                n_sites: 350,
            }
        );
    }

    #[test]
    fn test_unknown_fields_survive() -> Result<(), Error> {
        let json = r#"{
    "barcode": "BC",
    "instrument": "fluidigm",
    "samples": {
        "A_1": {
            "sample_name": "A",
            "biosample_id": "1",
            "sample_position": "3",
            "passed": true,
            "fluidigm_predicted_sex": "F",
            "genotype_matches": null,
            "call_rate": 0.98
        }
    },
    "run_date": "2024-01-01"
}"#;
        let report: RunReport = serde_json::from_str(json)?;
        assert_eq!(report.samples["A_1"].passed, Some(Value::Bool(true)));
        assert_eq!(report.extra["run_date"], Value::from("2024-01-01"));

        let out = String::from_utf8(utils::to_json_bytes(&report)?)?;
        assert_eq!(out, json);
        Ok(())
    }

    #[test]
    fn test_missing_samples_is_an_error() {
        let json = r#"{"barcode": "BC", "instrument": "fluidigm"}"#;
        assert!(serde_json::from_str::<RunReport>(json).is_err());
    }
}
