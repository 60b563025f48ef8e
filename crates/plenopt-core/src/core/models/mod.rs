//! # Core Models Module
//!
//! Data structures describing a partitioned analysis.
//!
//! ## Key Components
//!
//! - [`partition`] - Per-partition cached score, rate multiplier and alignment metadata
//! - [`topology`] - The shared tree together with all partitions, linked model groups and
//!   the shared gamma shape
//!
//! ```ignore
//! use plenopt::core::models::partition::{Partition, SeqType};
//! use plenopt::core::models::topology::PartitionedTopology;
//!
//! let partitions = vec![
//!     Partition::new(dna_model, 1200, SeqType::Dna),
//!     Partition::new(codon_model, 400, SeqType::Codon),
//! ];
//! let topology = PartitionedTopology::new(shared_tree, partitions, false)?
//!     .with_codon_rescaling(true);
//! ```

pub mod partition;
pub mod topology;
