//! # Core Module
//!
//! Stateless building blocks for partitioned likelihood optimization.
//!
//! ## Architecture
//!
//! - **Data Models** ([`models`]) - Partition records and the partitioned-topology container
//! - **Collaborator Contracts** ([`collaborators`]) - Traits implemented by the tree-likelihood
//!   evaluator, the per-partition model factories, linked models and the bounded optimizer
//!
//! Nothing in this layer decides *when* a parameter block is optimized; that is the job of
//! the [`crate::engine`] and [`crate::workflows`] layers.

pub mod collaborators;
pub mod models;
