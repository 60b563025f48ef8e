use super::partition::Partition;
use crate::core::collaborators::{LinkedModel, PartitionModel, SharedTree};
use std::fmt::Write as _;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum TopologyError {
    #[error("A partitioned topology needs at least one partition")]
    NoPartitions,
    #[error("Partition {index} has no alignment sites")]
    EmptyPartition { index: usize },
    #[error("Linked model '{group}' refers to partition {member}, but only {count} exist")]
    LinkedMemberOutOfRange {
        group: String,
        member: usize,
        count: usize,
    },
    #[error("Linked model '{group}' has no member partitions")]
    EmptyLinkedGroup { group: String },
}

/// Partitions whose parameters are tied to one shared [`LinkedModel`].
pub struct LinkedModelGroup {
    pub members: Vec<usize>,
    pub model: Box<dyn LinkedModel>,
}

impl LinkedModelGroup {
    pub fn new(members: Vec<usize>, model: Box<dyn LinkedModel>) -> Self {
        Self { members, model }
    }

    pub fn name(&self) -> &str {
        self.model.name()
    }
}

/// The shared tree, every partition hanging off it, and the cross-partition links.
pub struct PartitionedTopology<T, P> {
    pub tree: T,
    pub partitions: Vec<Partition<P>>,
    pub fixed_rates: bool,         // Edge-equal model: all partitions share rate 1.0
    pub rescale_codon_brlen: bool, // Codon branch lengths measured per nucleotide
    pub linked_models: Vec<LinkedModelGroup>,
    pub linked_alpha: Option<f64>, // Shared gamma shape once estimated
}

impl<T, P> PartitionedTopology<T, P>
where
    T: SharedTree,
    P: PartitionModel,
{
    pub fn new(
        tree: T,
        partitions: Vec<Partition<P>>,
        fixed_rates: bool,
    ) -> Result<Self, TopologyError> {
        if partitions.is_empty() {
            return Err(TopologyError::NoPartitions);
        }
        if let Some(index) = partitions.iter().position(|p| p.record.site_count == 0) {
            return Err(TopologyError::EmptyPartition { index });
        }
        Ok(Self {
            tree,
            partitions,
            fixed_rates,
            rescale_codon_brlen: false,
            linked_models: Vec::new(),
            linked_alpha: None,
        })
    }

    pub fn with_codon_rescaling(mut self, rescale: bool) -> Self {
        self.rescale_codon_brlen = rescale;
        self
    }

    pub fn add_linked_model(&mut self, group: LinkedModelGroup) -> Result<(), TopologyError> {
        if group.members.is_empty() {
            return Err(TopologyError::EmptyLinkedGroup {
                group: group.name().to_string(),
            });
        }
        let count = self.partitions.len();
        if let Some(&member) = group.members.iter().find(|&&m| m >= count) {
            return Err(TopologyError::LinkedMemberOutOfRange {
                group: group.name().to_string(),
                member,
                count,
            });
        }
        self.linked_models.push(group);
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    pub fn total_site_count(&self) -> usize {
        self.partitions.iter().map(|p| p.record.site_count).sum()
    }

    /// Sum of the cached per-partition scores.
    pub fn joint_score(&self) -> f64 {
        self.partitions.iter().map(|p| p.record.cur_score).sum()
    }

    pub fn reset_scores(&mut self) {
        for partition in &mut self.partitions {
            partition.record.invalidate_score();
        }
    }

    pub fn part_rates(&self) -> Vec<f64> {
        self.partitions.iter().map(|p| p.record.part_rate).collect()
    }

    /// Site-weighted mean of the partition rates. Codon columns count three times in the
    /// denominator when codon branch lengths are rescaled.
    pub fn weighted_mean_rate(&self) -> f64 {
        let (weighted_sum, site_total) =
            self.partitions
                .iter()
                .fold((0.0, 0usize), |(sum, sites), partition| {
                    let record = &partition.record;
                    (
                        sum + record.part_rate * record.site_count as f64,
                        sites
                            + record.site_count * record.seq_type.site_weight(self.rescale_codon_brlen),
                    )
                });
        weighted_sum / site_total as f64
    }

    pub fn max_branch_length(&self) -> f64 {
        self.tree
            .branch_lengths()
            .into_iter()
            .fold(0.0, f64::max)
    }

    /// "Partition-specific rates: ..." line, empty when rates are fixed.
    pub fn rate_report(&self) -> String {
        let mut out = String::new();
        if !self.fixed_rates {
            out.push_str("Partition-specific rates:");
            for partition in &self.partitions {
                let _ = write!(out, " {}", partition.record.part_rate);
            }
            out.push('\n');
        }
        out
    }

    /// The shared gamma shape (when linked) and one info line per linked model group.
    pub fn linked_report(&self) -> String {
        let mut out = String::new();
        if let Some(alpha) = self.linked_alpha {
            let _ = writeln!(out, "Linked gamma shape alpha: {alpha}");
        }
        for group in &self.linked_models {
            let _ = writeln!(out, "{}", group.model.info());
        }
        out
    }
}
