use crate::core::collaborators::{PartitionModel, SharedTree};
use crate::core::models::partition::Partition;
use crate::core::models::topology::PartitionedTopology;
use crate::engine::context::OptimizationContext;
use crate::engine::error::EngineError;
use crate::engine::progress::Progress;
use tracing::{info, instrument, trace};

const MAX_TOLERANCE_DIVISOR: usize = 10;

/// Optimizes every partition's substitution model and site rates independently and returns
/// the summed partition scores.
///
/// The gradient tolerance handed to each partition is divided by
/// `min(iteration, partitions, 10)`, so later rounds refine more tightly.
#[instrument(skip_all, name = "partition_model_task", fields(iteration = context.iteration))]
pub fn run<T, P>(
    topology: &mut PartitionedTopology<T, P>,
    context: &OptimizationContext,
) -> Result<f64, EngineError>
where
    T: SharedTree,
    P: PartitionModel,
{
    let partition_count = topology.len();
    let divisor = context
        .iteration
        .min(partition_count)
        .min(MAX_TOLERANCE_DIVISOR)
        .max(1);
    let gradient_epsilon = context.gradient_epsilon / divisor as f64;
    let step_budget = context.iteration + 1;
    let fixed_rates = topology.fixed_rates;
    let rate_tolerance = context.config.rate_deviation_tolerance;
    let reporter = context.reporter;

    reporter.report(Progress::TaskStart {
        partitions: partition_count as u64,
    });

    let scores = context.run_partitions(&mut topology.partitions, |index, partition| {
        let score = optimize_partition(
            index,
            partition,
            step_budget,
            gradient_epsilon,
            fixed_rates,
            rate_tolerance,
        )?;
        reporter.report(Progress::TaskIncrement);
        Ok(score)
    })?;

    reporter.report(Progress::TaskFinish);

    let total: f64 = scores.iter().sum();
    info!(lnl = total, "Partition models optimized.");
    Ok(total)
}

fn optimize_partition<P: PartitionModel>(
    index: usize,
    partition: &mut Partition<P>,
    step_budget: usize,
    gradient_epsilon: f64,
    fixed_rates: bool,
    rate_tolerance: f64,
) -> Result<f64, EngineError> {
    let Partition { record, model } = partition;

    let mut score = model.optimize_parameters_only(step_budget, gradient_epsilon, record.cur_score);
    if score == 0.0 {
        score = model.compute_likelihood();
    }
    record.cur_score = score;

    // Branch lengths stay in substitutions per site.
    let mean_rate = model.rescale_rates();
    if (mean_rate - 1.0).abs() > rate_tolerance {
        if fixed_rates {
            return Err(EngineError::FixedRateRescale {
                partition: index,
                mean_rate,
            });
        }
        model.scale_length(mean_rate);
        record.part_rate *= mean_rate;
        trace!(
            partition = index,
            mean_rate,
            part_rate = record.part_rate,
            "Absorbed rate-matrix scale into partition rate."
        );
    }

    trace!(partition = index, lnl = score, "Partition model optimized.");
    Ok(score)
}
