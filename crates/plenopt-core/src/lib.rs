//! # plenopt Core Library
//!
//! Joint parameter optimization for partitioned phylogenetic likelihood models in which
//! every alignment partition shares one tree topology and its branch lengths are related
//! to the shared lengths by a per-partition rate multiplier (the proportional, or
//! edge-unlinked, partition model).
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Plain partition records, the partitioned-topology
//!   container, and the contracts (`SharedTree`, `PartitionModel`, `LinkedModel`,
//!   `BoundedOptimizer`) through which the likelihood machinery is consumed. Rate-matrix
//!   math, branch-length search and numerical minimizers live behind these traits.
//!
//! - **[`engine`]: The Logic Core.** The stateful optimization blocks (per-partition model
//!   optimization, partition rate optimization, linked parameter optimization, branch
//!   lengths), the per-call `OptimizationContext`, configuration, progress reporting,
//!   regression guards and checkpointing of partition rates.
//!
//! - **[`workflows`]: The Public API.** The block-coordinate-descent loop that iterates the
//!   engine blocks to convergence, together with parameter counting and reporting.

pub mod core;
pub mod engine;
pub mod workflows;

#[cfg(test)]
pub(crate) mod test_support;
