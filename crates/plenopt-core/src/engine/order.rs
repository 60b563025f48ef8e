use super::error::EngineError;
use crate::core::collaborators::{PartitionModel, SharedTree};
use crate::core::models::partition::Partition;
use crate::core::models::topology::PartitionedTopology;
use std::cmp::Ordering;

/// Processing order over partitions, most expensive first, so that the longest jobs start
/// early in a parallel region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionOrder {
    indices: Vec<usize>,
}

impl PartitionOrder {
    pub fn plan<T, P>(topology: &PartitionedTopology<T, P>) -> Self
    where
        T: SharedTree,
        P: PartitionModel,
    {
        let costs: Vec<f64> = topology
            .partitions
            .iter()
            .map(|p| {
                p.model
                    .work_estimate()
                    .unwrap_or(p.record.site_count as f64)
            })
            .collect();

        let mut indices: Vec<usize> = (0..costs.len()).collect();
        indices.sort_by(|&a, &b| {
            costs[b]
                .partial_cmp(&costs[a])
                .unwrap_or(Ordering::Equal)
                .then(a.cmp(&b))
        });
        Self { indices }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.indices
    }

    pub fn is_permutation_of(&self, count: usize) -> bool {
        if self.indices.len() != count {
            return false;
        }
        let mut seen = vec![false; count];
        self.indices
            .iter()
            .all(|&i| i < count && !std::mem::replace(&mut seen[i], true))
    }

    /// Hands out one exclusive borrow per partition, in processing order.
    pub(crate) fn arrange<'p, P>(
        &self,
        partitions: &'p mut [Partition<P>],
    ) -> Result<Vec<(usize, &'p mut Partition<P>)>, EngineError> {
        let expected = partitions.len();
        if self.indices.len() != expected {
            return Err(EngineError::InvalidPartitionOrder { expected });
        }
        let mut slots: Vec<Option<&'p mut Partition<P>>> =
            partitions.iter_mut().map(Some).collect();
        self.indices
            .iter()
            .map(|&index| {
                slots
                    .get_mut(index)
                    .and_then(Option::take)
                    .map(|partition| (index, partition))
                    .ok_or(EngineError::InvalidPartitionOrder { expected })
            })
            .collect()
    }
}
