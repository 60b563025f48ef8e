use crate::core::collaborators::{PartitionModel, SharedTree};
use crate::core::models::topology::PartitionedTopology;
use crate::engine::config::BranchLengthMode;
use crate::engine::context::OptimizationContext;
use crate::engine::error::{EngineError, RegressionBlock};
use crate::engine::guards::ensure_no_regression;
use tracing::{info, instrument};

/// Optimizes the shared branch lengths according to `mode` and returns the new joint score.
///
/// `current` is the joint score before the call. The result may not fall more than the
/// regression tolerance below it. Once branch lengths have moved, every cached partition
/// score is stale and is reset to the "not computed" sentinel.
#[instrument(skip_all, name = "branch_length_task", fields(mode = ?mode, iteration = context.iteration))]
pub fn run<T, P>(
    topology: &mut PartitionedTopology<T, P>,
    context: &OptimizationContext,
    mode: BranchLengthMode,
    current: f64,
) -> Result<f64, EngineError>
where
    T: SharedTree,
    P: PartitionModel,
{
    let config = context.config;
    let lnl = match mode {
        BranchLengthMode::Fixed => return Ok(current),
        BranchLengthMode::Optimize => {
            let passes = config.max_branch_passes.min(context.iteration + 1);
            topology
                .tree
                .optimize_all_branches(passes, context.logl_epsilon)
        }
        BranchLengthMode::Scale => {
            let mut scaling = 1.0;
            let lnl = topology.tree.optimize_tree_length_scaling(
                config.min_brlen_scale,
                &mut scaling,
                config.max_brlen_scale,
                context.gradient_epsilon,
            );
            info!(scaling, "Tree length scaled.");
            lnl
        }
    };

    ensure_no_regression(
        RegressionBlock::BranchLengths,
        current,
        lnl,
        config.regression_tolerance,
        topology,
    )?;
    topology.reset_scores();
    info!(lnl, "Branch lengths optimized.");
    Ok(lnl)
}
