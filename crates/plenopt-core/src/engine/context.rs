use super::config::OptimizerConfig;
use super::error::EngineError;
use super::order::PartitionOrder;
use super::progress::ProgressReporter;
use crate::core::collaborators::{BoundedOptimizer, PartitionModel, SharedTree};
use crate::core::models::partition::Partition;
use crate::core::models::topology::PartitionedTopology;
use std::time::{Duration, Instant};
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// State scoped to a single `optimize_parameters` call.
pub struct OptimizationContext<'a> {
    pub config: &'a OptimizerConfig,
    pub reporter: &'a ProgressReporter<'a>,
    pub optimizer: &'a dyn BoundedOptimizer,
    pub gradient_epsilon: f64,
    pub logl_epsilon: f64,
    pub iteration: usize,
    order: PartitionOrder,
    started: Instant,
    #[cfg(feature = "parallel")]
    pool: Option<rayon::ThreadPool>,
}

impl<'a> OptimizationContext<'a> {
    pub fn new(
        config: &'a OptimizerConfig,
        reporter: &'a ProgressReporter<'a>,
        optimizer: &'a dyn BoundedOptimizer,
        logl_epsilon: f64,
        gradient_epsilon: f64,
    ) -> Result<Self, EngineError> {
        #[cfg(feature = "parallel")]
        let pool = if config.num_threads > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.num_threads)
                .build()
                .map_err(|e| EngineError::ThreadPool(e.to_string()))?;
            Some(pool)
        } else {
            None
        };

        Ok(Self {
            config,
            reporter,
            optimizer,
            gradient_epsilon,
            logl_epsilon,
            iteration: 0,
            order: PartitionOrder::default(),
            started: Instant::now(),
            #[cfg(feature = "parallel")]
            pool,
        })
    }

    /// Plans the partition order on first use; later calls return the cached order.
    pub fn ensure_order<T, P>(&mut self, topology: &PartitionedTopology<T, P>) -> &PartitionOrder
    where
        T: SharedTree,
        P: PartitionModel,
    {
        if self.order.is_empty() {
            self.order = PartitionOrder::plan(topology);
            debug!(order = ?self.order.as_slice(), "Partition order computed.");
        }
        &self.order
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Runs `task` once per partition in the cached order and returns the per-partition
    /// results in that order. Each invocation gets exclusive access to its partition only.
    /// Runs on the worker pool when one is configured and there is more than one partition.
    pub fn run_partitions<P, F>(
        &self,
        partitions: &mut [Partition<P>],
        task: F,
    ) -> Result<Vec<f64>, EngineError>
    where
        P: PartitionModel,
        F: Fn(usize, &mut Partition<P>) -> Result<f64, EngineError> + Send + Sync,
    {
        let ordered = self.order.arrange(partitions)?;

        #[cfg(feature = "parallel")]
        if let Some(pool) = self.pool.as_ref().filter(|_| ordered.len() > 1) {
            return pool.install(|| {
                ordered
                    .into_par_iter()
                    .map(|(index, partition)| task(index, partition))
                    .collect()
            });
        }

        ordered
            .into_iter()
            .map(|(index, partition)| task(index, partition))
            .collect()
    }
}
