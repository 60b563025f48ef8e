use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SeqType {
    #[default]
    Dna,
    Protein,
    Codon,
    Morphology,
    Binary,
}

impl SeqType {
    /// Number of sites a single alignment column stands for when branch lengths are
    /// measured per nucleotide.
    #[inline]
    pub fn site_weight(self, rescale_codon_brlen: bool) -> usize {
        match self {
            SeqType::Codon if rescale_codon_brlen => 3,
            _ => 1,
        }
    }
}

impl fmt::Display for SeqType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SeqType::Dna => "DNA",
            SeqType::Protein => "AA",
            SeqType::Codon => "CODON",
            SeqType::Morphology => "MORPH",
            SeqType::Binary => "BIN",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown sequence type: '{0}'")]
pub struct ParseSeqTypeError(pub String);

impl FromStr for SeqType {
    type Err = ParseSeqTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DNA" | "NT" => Ok(SeqType::Dna),
            "AA" | "PROTEIN" => Ok(SeqType::Protein),
            "CODON" => Ok(SeqType::Codon),
            "MORPH" | "MORPHOLOGY" => Ok(SeqType::Morphology),
            "BIN" | "BINARY" => Ok(SeqType::Binary),
            _ => Err(ParseSeqTypeError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartitionRecord {
    pub cur_score: f64,     // Cached log-likelihood; 0.0 means not computed
    pub part_rate: f64,     // Rate multiplier relative to the shared tree
    pub site_count: usize,  // Alignment columns in this partition
    pub seq_type: SeqType,
}

impl PartitionRecord {
    pub fn new(site_count: usize, seq_type: SeqType) -> Self {
        Self {
            cur_score: 0.0,
            part_rate: 1.0,
            site_count,
            seq_type,
        }
    }

    #[inline]
    pub fn invalidate_score(&mut self) {
        self.cur_score = 0.0;
    }

    #[inline]
    pub fn has_score(&self) -> bool {
        self.cur_score != 0.0
    }
}

/// A partition record together with the model factory that owns its subtree.
#[derive(Debug, Clone)]
pub struct Partition<P> {
    pub record: PartitionRecord,
    pub model: P,
}

impl<P> Partition<P> {
    pub fn new(model: P, site_count: usize, seq_type: SeqType) -> Self {
        Self {
            record: PartitionRecord::new(site_count, seq_type),
            model,
        }
    }

    pub fn with_rate(mut self, part_rate: f64) -> Self {
        self.record.part_rate = part_rate;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_starts_with_unit_rate_and_no_score() {
        let record = PartitionRecord::new(120, SeqType::Protein);
        assert_eq!(record.part_rate, 1.0);
        assert_eq!(record.cur_score, 0.0);
        assert!(!record.has_score());
    }

    #[test]
    fn invalidate_score_resets_to_sentinel() {
        let mut record = PartitionRecord::new(10, SeqType::Dna);
        record.cur_score = -532.7;
        assert!(record.has_score());
        record.invalidate_score();
        assert!(!record.has_score());
    }

    #[test]
    fn codon_sites_weigh_three_only_when_rescaling() {
        assert_eq!(SeqType::Codon.site_weight(true), 3);
        assert_eq!(SeqType::Codon.site_weight(false), 1);
        assert_eq!(SeqType::Dna.site_weight(true), 1);
    }

    #[test]
    fn seq_type_parses_case_insensitively() {
        assert_eq!("codon".parse::<SeqType>().unwrap(), SeqType::Codon);
        assert_eq!("Protein".parse::<SeqType>().unwrap(), SeqType::Protein);
        assert!("RNA-ish".parse::<SeqType>().is_err());
    }

    #[test]
    fn with_rate_overrides_initial_multiplier() {
        let partition = Partition::new((), 50, SeqType::Dna).with_rate(2.5);
        assert_eq!(partition.record.part_rate, 2.5);
        assert_eq!(partition.record.site_count, 50);
    }
}
