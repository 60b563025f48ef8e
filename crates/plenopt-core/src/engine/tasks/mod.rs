//! Optimization blocks of the block-coordinate-descent loop.
//!
//! Each submodule optimizes one group of parameters while all others are held fixed and
//! returns the joint log-likelihood it leaves behind. The blocks never check each other's
//! results; the outer loop in [`crate::workflows::optimize`] does that.

pub mod branch_lengths;
pub mod gene_rates;
pub mod linked_params;
pub mod partition_models;
