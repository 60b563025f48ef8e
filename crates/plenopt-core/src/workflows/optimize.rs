use crate::core::collaborators::{BoundedOptimizer, PartitionModel, SharedTree};
use crate::core::models::topology::PartitionedTopology;
use crate::engine::config::{BranchLengthMode, OptimizerConfig};
use crate::engine::context::OptimizationContext;
use crate::engine::error::{EngineError, RegressionBlock};
use crate::engine::guards::ensure_no_regression;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::tasks;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Per-call knobs of [`optimize_parameters`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizationRequest {
    pub brlen_mode: BranchLengthMode,
    pub verbose_reporting: bool,
    pub logl_epsilon: f64,     // Convergence threshold on the joint log-likelihood
    pub gradient_epsilon: f64, // Tolerance handed to the inner optimizers
}

impl Default for OptimizationRequest {
    fn default() -> Self {
        Self {
            brlen_mode: BranchLengthMode::Optimize,
            verbose_reporting: false,
            logl_epsilon: 0.01,
            gradient_epsilon: 1e-4,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterOptimizationResult {
    pub log_likelihood: f64,
    pub rounds: usize,
    pub converged: bool,
    pub elapsed: Duration,
}

/// Jointly optimizes every model parameter of `topology` by block coordinate descent.
///
/// Each round optimizes the per-partition models, then the shared gamma shape or the linked
/// model groups, then (unless rates are fixed) the partition rate multipliers, and finally
/// the shared branch lengths according to `request.brlen_mode`. The loop stops once the
/// joint log-likelihood changes by less than `request.logl_epsilon` or after
/// `num_param_iterations - 1` rounds.
///
/// A block that lowers the joint log-likelihood beyond its tolerance aborts the whole call
/// with [`EngineError::Regression`]; no later block runs.
#[instrument(skip_all, name = "parameter_optimization_workflow", fields(partitions = topology.len()))]
pub fn optimize_parameters<T, P>(
    topology: &mut PartitionedTopology<T, P>,
    config: &OptimizerConfig,
    optimizer: &dyn BoundedOptimizer,
    reporter: &ProgressReporter,
    request: &OptimizationRequest,
) -> Result<ParameterOptimizationResult, EngineError>
where
    T: SharedTree,
    P: PartitionModel,
{
    config.validate()?;
    if config.link_alpha && !topology.linked_models.is_empty() {
        return Err(EngineError::ConflictingLinks);
    }

    let mut context = OptimizationContext::new(
        config,
        reporter,
        optimizer,
        request.logl_epsilon,
        request.gradient_epsilon,
    )?;

    reporter.report(Progress::PhaseStart {
        name: "Parameter Optimization",
    });

    topology.reset_scores();
    let mut tree_lh = topology.tree.compute_likelihood();
    info!(lnl = tree_lh, "Initial log-likelihood.");
    reporter.report(Progress::Message(format!(
        "Initial log-likelihood: {tree_lh}"
    )));

    let mut rounds = 0;
    let mut converged = false;
    for iteration in 1..config.num_param_iterations {
        context.iteration = iteration;
        rounds = iteration;
        reporter.report(Progress::RoundStart { iteration });

        let new_lh = run_round(topology, &mut context, request, tree_lh)?;

        info!(iteration, lnl = new_lh, "Current log-likelihood at step {iteration}.");
        reporter.report(Progress::RoundFinish {
            iteration,
            log_likelihood: new_lh,
        });
        reporter.message(format!(
            "Current log-likelihood at step {iteration}: {new_lh}"
        ));

        if (new_lh - tree_lh).abs() < request.logl_epsilon {
            tree_lh = new_lh;
            converged = true;
            break;
        }
        ensure_no_regression(
            RegressionBlock::OuterIteration,
            tree_lh,
            new_lh,
            config.regression_tolerance,
            topology,
        )?;
        tree_lh = new_lh;
    }

    let elapsed = context.elapsed();
    if request.verbose_reporting {
        let summary = write_info(topology);
        info!("{}", summary.trim_end());
        reporter.report(Progress::Message(summary));
    }
    info!(
        rounds,
        converged,
        lnl = tree_lh,
        "Parameters optimization took {} rounds ({:.3} sec)",
        rounds,
        elapsed.as_secs_f64()
    );
    reporter.report(Progress::Message(format!(
        "Parameters optimization took {rounds} rounds ({:.3} sec)",
        elapsed.as_secs_f64()
    )));
    reporter.report(Progress::PhaseFinish);

    Ok(ParameterOptimizationResult {
        log_likelihood: tree_lh,
        rounds,
        converged,
        elapsed,
    })
}

/// One pass over all blocks. `tree_lh` is the joint score at the end of the previous round.
fn run_round<T, P>(
    topology: &mut PartitionedTopology<T, P>,
    context: &mut OptimizationContext,
    request: &OptimizationRequest,
    tree_lh: f64,
) -> Result<f64, EngineError>
where
    T: SharedTree,
    P: PartitionModel,
{
    let config = context.config;
    context.ensure_order(topology);

    let mut cur_lh = tasks::partition_models::run(topology, context)?;
    if config.link_alpha {
        cur_lh = tasks::linked_params::optimize_shared_alpha(topology, context)?;
    }
    if !topology.linked_models.is_empty() {
        let linked_lh = tasks::linked_params::run(topology, context)?;
        ensure_no_regression(
            RegressionBlock::LinkedModels,
            cur_lh,
            linked_lh,
            config.linked_model_tolerance,
            topology,
        )?;
        cur_lh = linked_lh;
    }
    debug!(lnl = cur_lh, "LnL after optimizing individual models.");
    ensure_no_regression(
        RegressionBlock::IndividualModels,
        tree_lh,
        cur_lh,
        config.regression_tolerance,
        topology,
    )?;

    topology.tree.clear_all_partial_lh();

    if !topology.fixed_rates {
        cur_lh = tasks::gene_rates::run(topology, context)?;
        debug!(lnl = cur_lh, "LnL after optimizing partition-specific rates.");
        debug!("{}", topology.rate_report().trim_end());
        ensure_no_regression(
            RegressionBlock::PartitionRates,
            tree_lh,
            cur_lh,
            config.regression_tolerance,
            topology,
        )?;
    }

    tasks::branch_lengths::run(topology, context, request.brlen_mode, cur_lh)
}

/// Thorough I+G optimization is not available for edge-proportional partition models.
pub fn optimize_parameters_gamma_invar<T, P>(
    _topology: &mut PartitionedTopology<T, P>,
    _config: &OptimizerConfig,
    _request: &OptimizationRequest,
) -> Result<ParameterOptimizationResult, EngineError>
where
    T: SharedTree,
    P: PartitionModel,
{
    Err(EngineError::UnsupportedThoroughGammaInvar)
}

/// Number of free parameters of the joint model.
///
/// The shared branch lengths are always counted, whatever `_mode` the optimizer ran under.
/// Linked groups are counted with their parameters temporarily unfixed; each group's fixed
/// flag is restored afterwards.
pub fn n_parameters<T, P>(topology: &mut PartitionedTopology<T, P>, _mode: BranchLengthMode) -> usize
where
    T: SharedTree,
    P: PartitionModel,
{
    let mut df: usize = topology
        .partitions
        .iter()
        .map(|p| p.model.dimensions().total())
        .sum();

    df += topology.tree.branch_count();
    if !topology.fixed_rates {
        df += topology.len() - 1;
    }
    if topology.linked_alpha.is_some_and(|alpha| alpha > 0.0) {
        df += 1;
    }
    for group in &mut topology.linked_models {
        let was_fixed = group.model.fix_parameters(false);
        df += group.model.n_dim() + group.model.n_dim_freq();
        group.model.fix_parameters(was_fixed);
    }
    df
}

/// The partition-rate and linked-parameter report printed after optimization.
pub fn write_info<T, P>(topology: &PartitionedTopology<T, P>) -> String
where
    T: SharedTree,
    P: PartitionModel,
{
    let mut info = topology.rate_report();
    info.push_str(&topology.linked_report());
    info
}
