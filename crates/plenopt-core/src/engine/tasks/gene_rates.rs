use crate::core::collaborators::{PartitionModel, SharedTree};
use crate::core::models::topology::PartitionedTopology;
use crate::engine::context::OptimizationContext;
use crate::engine::error::EngineError;
use crate::engine::progress::Progress;
use tracing::{debug, info, instrument, trace, warn};

/// Optimizes each partition's rate multiplier as a tree-length scaling problem, then folds
/// the site-weighted mean multiplier into the shared tree so the mean becomes exactly 1.0.
///
/// Returns the summed partition scores. Normalization only reparameterizes the model, so the
/// scores stay valid afterwards.
#[instrument(skip_all, name = "gene_rate_task", fields(iteration = context.iteration))]
pub fn run<T, P>(
    topology: &mut PartitionedTopology<T, P>,
    context: &mut OptimizationContext,
) -> Result<f64, EngineError>
where
    T: SharedTree,
    P: PartitionModel,
{
    let max_brlen = topology.max_branch_length();
    context.ensure_order(topology);

    let total_sites = topology.total_site_count() as f64;
    let gradient_epsilon = context.gradient_epsilon;
    let reporter = context.reporter;

    reporter.report(Progress::TaskStart {
        partitions: topology.len() as u64,
    });

    let scores = context.run_partitions(&mut topology.partitions, |index, partition| {
        let record = &mut partition.record;
        let sites = record.site_count as f64;
        // The current rate must stay feasible.
        let min_scaling = (1.0 / sites).min(record.part_rate);
        let max_scaling = (total_sites / sites).max(record.part_rate);

        let mut rate = record.part_rate;
        let score = partition.model.optimize_tree_length_scaling(
            min_scaling,
            &mut rate,
            max_scaling,
            gradient_epsilon,
        );
        record.part_rate = rate;
        record.cur_score = score;
        trace!(
            partition = index,
            rate,
            min_scaling,
            max_scaling,
            lnl = score,
            "Partition rate optimized."
        );
        reporter.report(Progress::TaskIncrement);
        Ok(score)
    })?;

    reporter.report(Progress::TaskFinish);

    let total: f64 = scores.iter().sum();
    normalize_rates(topology, max_brlen, context)?;
    info!(lnl = total, "Partition rates optimized.");
    Ok(total)
}

fn normalize_rates<T, P>(
    topology: &mut PartitionedTopology<T, P>,
    max_brlen: f64,
    context: &OptimizationContext,
) -> Result<(), EngineError>
where
    T: SharedTree,
    P: PartitionModel,
{
    let mean = topology.weighted_mean_rate();
    if !mean.is_finite() || mean <= 0.0 {
        return Err(EngineError::Internal(format!(
            "weighted mean partition rate is {mean}"
        )));
    }

    if mean > context.config.max_branch_length / max_brlen {
        warn!(
            mean_rate = mean,
            max_branch_length = max_brlen,
            "Too high (saturated) partition rates for proportional partition model!"
        );
        context.reporter.warning(format!(
            "too high (saturated) partition rates (mean {mean:.4}) for proportional partition model"
        ));
    }

    topology.tree.scale_length(mean);
    for partition in &mut topology.partitions {
        partition.record.part_rate /= mean;
    }
    debug!(mean_rate = mean, "Partition rates normalized into shared tree.");
    Ok(())
}
