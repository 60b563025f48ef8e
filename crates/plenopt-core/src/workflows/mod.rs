//! # Workflows Module
//!
//! High-level entry points for optimizing the model parameters of an edge-proportional
//! partitioned topology.
//!
//! ## Overview
//!
//! A workflow takes a fully assembled [`crate::core::models::topology::PartitionedTopology`]
//! and runs the block-coordinate-descent loop over it: per-partition models, linked
//! parameters, partition rates and branch lengths, until the joint log-likelihood stops
//! improving or the iteration budget runs out. The topology is updated in place.
//!
//! - **Parameter Optimization** ([`optimize`]) - The outer loop, free-parameter counting
//!   and the partition-rate report.

pub mod optimize;
