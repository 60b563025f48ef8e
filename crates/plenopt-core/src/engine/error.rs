use super::config::ConfigError;
use crate::core::models::topology::TopologyError;
use std::fmt;
use thiserror::Error;

/// The optimization block whose result is checked against the previous joint likelihood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegressionBlock {
    IndividualModels,
    LinkedModels,
    PartitionRates,
    BranchLengths,
    OuterIteration,
}

impl fmt::Display for RegressionBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegressionBlock::IndividualModels => "individual model optimization",
            RegressionBlock::LinkedModels => "linked model optimization",
            RegressionBlock::PartitionRates => "partition rate optimization",
            RegressionBlock::BranchLengths => "branch length optimization",
            RegressionBlock::OuterIteration => "outer iteration",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Invalid partitioned topology: {source}")]
    Topology {
        #[from]
        source: TopologyError,
    },

    #[error(
        "Partition {partition} has mean rate {mean_rate} but partition rates are fixed (edge-equal model). \
         Please use a proportional edge-linked partition model instead"
    )]
    FixedRateRescale { partition: usize, mean_rate: f64 },

    #[error("Thorough I+G parameter optimization does not work with the edge-linked partition model")]
    UnsupportedThoroughGammaInvar,

    #[error("A shared gamma shape cannot be combined with linked substitution models")]
    ConflictingLinks,

    #[error("A shared gamma shape was requested but no partition models rate heterogeneity")]
    MissingGammaShape,

    #[error(
        "{block} reduced the log-likelihood from {previous} to {current} (tolerance {tolerance})\n{diagnostics}"
    )]
    Regression {
        block: RegressionBlock,
        previous: f64,
        current: f64,
        tolerance: f64,
        diagnostics: String,
    },

    #[error("Partition order is not a permutation of {expected} partitions")]
    InvalidPartitionOrder { expected: usize },

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Failed to build worker thread pool: {0}")]
    ThreadPool(String),

    #[error("Internal logic error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn regression_block(&self) -> Option<RegressionBlock> {
        match self {
            EngineError::Regression { block, .. } => Some(*block),
            _ => None,
        }
    }
}
