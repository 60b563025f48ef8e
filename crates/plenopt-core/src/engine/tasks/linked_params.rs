use crate::core::collaborators::{PartitionModel, SharedTree};
use crate::core::models::partition::Partition;
use crate::core::models::topology::{LinkedModelGroup, PartitionedTopology};
use crate::engine::context::OptimizationContext;
use crate::engine::error::EngineError;
use crate::engine::progress::Progress;
use tracing::{debug, info, instrument};

pub const MIN_GAMMA_SHAPE: f64 = 0.02;
pub const MAX_GAMMA_SHAPE: f64 = 1000.0;

/// Optimizes every linked model group against the combined likelihood of its members and
/// returns the joint score over all partitions.
#[instrument(skip_all, name = "linked_model_task", fields(groups = topology.linked_models.len()))]
pub fn run<T, P>(
    topology: &mut PartitionedTopology<T, P>,
    context: &OptimizationContext,
) -> Result<f64, EngineError>
where
    T: SharedTree,
    P: PartitionModel,
{
    let PartitionedTopology {
        tree,
        partitions,
        linked_models,
        ..
    } = topology;

    context.reporter.report(Progress::TaskStart {
        partitions: linked_models.len() as u64,
    });
    for group in linked_models.iter_mut() {
        let lnl = optimize_group(group, partitions, tree, context)?;
        info!(group = group.name(), lnl, "Linked model optimized.");
        context.reporter.report(Progress::TaskIncrement);
    }
    context.reporter.report(Progress::TaskFinish);

    Ok(topology.joint_score())
}

fn optimize_group<T, P>(
    group: &mut LinkedModelGroup,
    partitions: &mut [Partition<P>],
    tree: &mut T,
    context: &OptimizationContext,
) -> Result<f64, EngineError>
where
    T: SharedTree,
    P: PartitionModel,
{
    if let Some(&member) = group.members.iter().find(|&&m| m >= partitions.len()) {
        return Err(EngineError::Internal(format!(
            "linked model '{}' refers to missing partition {}",
            group.name(),
            member
        )));
    }

    let name = group.name().to_string();
    let members = &group.members;
    let (lower, upper) = group.model.bounds();
    let mut variables = group.model.variables();
    if variables.len() != lower.len() || variables.len() != upper.len() {
        return Err(EngineError::Internal(format!(
            "linked model '{name}' has {} variables but {}/{} bounds",
            variables.len(),
            lower.len(),
            upper.len()
        )));
    }

    if !variables.is_empty() {
        context.optimizer.maximize(
            &mut variables,
            &lower,
            &upper,
            context.gradient_epsilon,
            &mut |values: &[f64]| {
                tree.clear_all_partial_lh();
                members
                    .iter()
                    .map(|&m| {
                        let model = &mut partitions[m].model;
                        model.apply_linked_parameters(&name, values);
                        model.compute_likelihood()
                    })
                    .sum::<f64>()
            },
        );
        group.model.set_variables(&variables);
    }

    tree.clear_all_partial_lh();
    let mut lnl = 0.0;
    for &m in &group.members {
        let partition = &mut partitions[m];
        partition.model.apply_linked_parameters(&name, &variables);
        partition.record.cur_score = partition.model.compute_likelihood();
        lnl += partition.record.cur_score;
    }
    Ok(lnl)
}

/// Optimizes one gamma shape shared by every partition and returns the joint score.
#[instrument(skip_all, name = "linked_alpha_task")]
pub fn optimize_shared_alpha<T, P>(
    topology: &mut PartitionedTopology<T, P>,
    context: &OptimizationContext,
) -> Result<f64, EngineError>
where
    T: SharedTree,
    P: PartitionModel,
{
    let start = match topology.linked_alpha {
        Some(alpha) => alpha,
        None => mean_gamma_shape(&topology.partitions).ok_or(EngineError::MissingGammaShape)?,
    };

    let PartitionedTopology {
        tree, partitions, ..
    } = topology;

    let mut alpha = [start.clamp(MIN_GAMMA_SHAPE, MAX_GAMMA_SHAPE)];
    context.optimizer.maximize(
        &mut alpha,
        &[MIN_GAMMA_SHAPE],
        &[MAX_GAMMA_SHAPE],
        context.gradient_epsilon,
        &mut |values: &[f64]| {
            tree.clear_all_partial_lh();
            partitions
                .iter_mut()
                .map(|partition| {
                    partition.model.set_gamma_shape(values[0]);
                    partition.model.compute_likelihood()
                })
                .sum::<f64>()
        },
    );

    tree.clear_all_partial_lh();
    for partition in partitions.iter_mut() {
        partition.model.set_gamma_shape(alpha[0]);
        partition.record.cur_score = partition.model.compute_likelihood();
    }
    topology.linked_alpha = Some(alpha[0]);

    let lnl = topology.joint_score();
    debug!(alpha = alpha[0], lnl, "Shared gamma shape optimized.");
    Ok(lnl)
}

fn mean_gamma_shape<P: PartitionModel>(partitions: &[Partition<P>]) -> Option<f64> {
    let shapes: Vec<f64> = partitions
        .iter()
        .filter_map(|p| p.model.gamma_shape())
        .collect();
    if shapes.is_empty() {
        None
    } else {
        Some(shapes.iter().sum::<f64>() / shapes.len() as f64)
    }
}
