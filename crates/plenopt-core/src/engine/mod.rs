//! # Engine Module
//!
//! The stateful side of joint parameter optimization for edge-proportional partition
//! models.
//!
//! ## Overview
//!
//! One call of [`crate::workflows::optimize::optimize_parameters`] drives the blocks in
//! [`tasks`] in turn: per-partition model parameters, the optional shared gamma shape,
//! linked model groups, partition rate multipliers, and finally the shared branch lengths.
//! Each block holds every other parameter fixed and reports the joint log-likelihood it
//! leaves behind, which the loop checks against the previous value with [`guards`].
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Iteration budget, scaling bounds, tolerances and
//!   worker threads, loadable from TOML
//! - **Context** (`context`) - Per-call state: iteration counter, cached partition order,
//!   worker pool and the fan-out helper used by the parallel blocks
//! - **Ordering** ([`order`]) - Most-expensive-first processing order of partitions
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events
//! - **Checkpointing** ([`checkpoint`]) - Persistence of the partition rate multipliers
//! - **Error Handling** ([`error`]) - Configuration, regression and setup failures

pub mod checkpoint;
pub mod config;
pub(crate) mod context;
pub mod error;
pub(crate) mod guards;
pub mod order;
pub mod progress;
pub(crate) mod tasks;
