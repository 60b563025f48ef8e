use super::error::{EngineError, RegressionBlock};
use crate::core::collaborators::{PartitionModel, SharedTree};
use crate::core::models::topology::PartitionedTopology;
use tracing::error;

/// Fails unless `current > reference - tolerance`. A NaN score always fails.
///
/// On failure the current parameter state and the branch-length annotated tree are logged
/// and carried inside the returned error.
pub fn ensure_no_regression<T, P>(
    block: RegressionBlock,
    reference: f64,
    current: f64,
    tolerance: f64,
    topology: &PartitionedTopology<T, P>,
) -> Result<(), EngineError>
where
    T: SharedTree,
    P: PartitionModel,
{
    if current > reference - tolerance {
        return Ok(());
    }

    let diagnostics = dump_state(topology);
    error!(
        %block,
        previous = reference,
        current,
        tolerance,
        "Log-likelihood regression detected.\n{}",
        diagnostics
    );
    Err(EngineError::Regression {
        block,
        previous: reference,
        current,
        tolerance,
        diagnostics,
    })
}

fn dump_state<T, P>(topology: &PartitionedTopology<T, P>) -> String
where
    T: SharedTree,
    P: PartitionModel,
{
    let mut dump = topology.rate_report();
    dump.push_str(&topology.linked_report());
    for (index, partition) in topology.partitions.iter().enumerate() {
        dump.push_str(&format!(
            "Partition {}: lnL = {}, sites = {}\n",
            index, partition.record.cur_score, partition.record.site_count
        ));
    }
    dump.push_str(&topology.tree.to_newick());
    dump
}
