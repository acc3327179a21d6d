//! Naming conventions for Fluidigm sample labels and somalier sample ids.
//!
//! Sample labels on the Fluidigm chip are composite identifiers of the form
//! `<sample_name>_<biosample_id>`, where the sample name may itself contain
//! underscores. Somalier sample ids additionally carry the plate barcode as
//! a leading segment: `<plate_barcode>_<sample_name>_<biosample_id>`.

use itertools::Itertools;

const SEPARATOR: char = '_';

/// A borrowed, underscore-delimited composite identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CompositeId<'a>(&'a str);

impl<'a> CompositeId<'a> {
    pub fn new(id: &'a str) -> Self {
        CompositeId(id)
    }

    pub fn as_str(&self) -> &'a str {
        self.0
    }

    /// Everything but the last segment, as used for a chip sample record.
    /// An identifier without an underscore has an empty sample name.
    pub fn sample_name(&self) -> &'a str {
        match self.0.rfind(SEPARATOR) {
            Some(pos) => &self.0[..pos],
            None => "",
        }
    }

    /// The last segment.
    pub fn biosample_id(&self) -> &'a str {
        match self.0.rfind(SEPARATOR) {
            Some(pos) => &self.0[pos + 1..],
            None => self.0,
        }
    }

    /// The first segment. For somalier ids this is the plate barcode.
    pub fn plate_barcode(&self) -> &'a str {
        self.0.split(SEPARATOR).next().unwrap_or_default()
    }

    /// Everything but the first segment. This is the sample name recorded
    /// for a genotype match, and the form a chip key takes when it is
    /// compared against a somalier id.
    pub fn without_first_segment(&self) -> String {
        self.0.split(SEPARATOR).dropping(1).join("_")
    }
}

/// Normalise a chip well label such as `S12-A01` to its sample position
/// (`12`): keep the part before the first hyphen and drop every `S`.
pub fn sample_position(well: &str) -> String {
    let chamber = well.split('-').next().unwrap_or_default();
    chamber.replace('S', "")
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::{prop_assert, prop_assert_eq, proptest};

    #[test]
    fn test_chip_label() {
        let id = CompositeId::new("HG002_blood_BS00123");
        assert_eq!(id.sample_name(), "HG002_blood");
        assert_eq!(id.biosample_id(), "BS00123");
    }

    #[test]
    fn test_somalier_id() {
        let id = CompositeId::new("PLATE2_SAMP_B02");
        assert_eq!(id.plate_barcode(), "PLATE2");
        assert_eq!(id.without_first_segment(), "SAMP_B02");
        assert_eq!(id.biosample_id(), "B02");
    }

    #[test]
    fn test_no_separator() {
        let id = CompositeId::new("BS00123");
        assert_eq!(id.sample_name(), "");
        assert_eq!(id.biosample_id(), "BS00123");
        assert_eq!(id.plate_barcode(), "BS00123");
        assert_eq!(id.without_first_segment(), "");
    }

    #[test]
    fn test_empty_segments() {
        let id = CompositeId::new("_A__B_");
        assert_eq!(id.sample_name(), "_A__B");
        assert_eq!(id.biosample_id(), "");
        assert_eq!(id.plate_barcode(), "");
        assert_eq!(id.without_first_segment(), "A__B_");
    }

    #[test]
    fn test_sample_position() {
        assert_eq!(sample_position("S12-A01"), "12");
        assert_eq!(sample_position("S05"), "05");
        assert_eq!(sample_position("12-S01"), "12");
        assert_eq!(sample_position("SS1S-x-y"), "1");
        assert_eq!(sample_position(""), "");
    }

    proptest! {
        #[test]
        fn prop_test_reconstruct_chip_label(id in "[A-Za-z0-9]{0,6}(_[A-Za-z0-9]{0,6}){1,4}") {
            let cid = CompositeId::new(&id);
            prop_assert_eq!(format!("{}_{}", cid.sample_name(), cid.biosample_id()), id.clone());
        }

        #[test]
        fn prop_test_reconstruct_somalier_id(id in "[A-Za-z0-9_]{0,20}") {
            let cid = CompositeId::new(&id);
            let rebuilt = if id.contains('_') {
                format!("{}_{}", cid.plate_barcode(), cid.without_first_segment())
            } else {
                cid.plate_barcode().to_string()
            };
            prop_assert_eq!(rebuilt, id.clone());
        }

        #[test]
        fn prop_test_sample_position(well in "[S0-9A-H-]{0,12}") {
            let pos = sample_position(&well);
            prop_assert!(!pos.contains('S'));
            prop_assert!(!pos.contains('-'));
            prop_assert!(pos.len() <= well.len());
        }
    }
}
