use super::error::EngineError;
use crate::core::collaborators::{PartitionModel, SharedTree};
use crate::core::models::topology::PartitionedTopology;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

const STRUCT_NAME: &str = "PartitionRates";
const RATES_KEY: &str = "part_rates";

/// Keyed storage for checkpointed arrays, scoped by named structures.
pub trait Checkpoint {
    fn start_struct(&mut self, name: &str);
    fn end_struct(&mut self);
    fn save_array(&mut self, key: &str, values: &[f64]);
    /// The array stored under `key` in the current scope, if any.
    fn restore_array(&self, key: &str) -> Option<Vec<f64>>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryCheckpoint {
    entries: BTreeMap<String, Vec<f64>>,
    #[serde(skip)]
    scope: Vec<String>,
}

impl MemoryCheckpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_toml_string(&self) -> Result<String, EngineError> {
        toml::to_string(self).map_err(|e| EngineError::Checkpoint(e.to_string()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self, EngineError> {
        toml::from_str(content).map_err(|e| EngineError::Checkpoint(e.to_string()))
    }

    fn scoped_key(&self, key: &str) -> String {
        let mut full = self.scope.join("/");
        if !full.is_empty() {
            full.push('/');
        }
        full.push_str(key);
        full
    }
}

impl Checkpoint for MemoryCheckpoint {
    fn start_struct(&mut self, name: &str) {
        self.scope.push(name.to_string());
    }

    fn end_struct(&mut self) {
        self.scope.pop();
    }

    fn save_array(&mut self, key: &str, values: &[f64]) {
        let full = self.scoped_key(key);
        self.entries.insert(full, values.to_vec());
    }

    fn restore_array(&self, key: &str) -> Option<Vec<f64>> {
        self.entries.get(&self.scoped_key(key)).cloned()
    }
}

/// Stores the partition rates. Nothing is written when rates are fixed.
pub fn save_rates<T, P, C>(topology: &PartitionedTopology<T, P>, checkpoint: &mut C)
where
    T: SharedTree,
    P: PartitionModel,
    C: Checkpoint + ?Sized,
{
    if topology.fixed_rates {
        return;
    }
    checkpoint.start_struct(STRUCT_NAME);
    checkpoint.save_array(RATES_KEY, &topology.part_rates());
    checkpoint.end_struct();
    debug!(partitions = topology.len(), "Partition rates checkpointed.");
}

/// Restores the partition rates and remaps the partition subtrees.
///
/// Returns `Ok(false)` when rates are fixed or nothing was stored.
pub fn restore_rates<T, P, C>(
    topology: &mut PartitionedTopology<T, P>,
    checkpoint: &mut C,
) -> Result<bool, EngineError>
where
    T: SharedTree,
    P: PartitionModel,
    C: Checkpoint + ?Sized,
{
    if topology.fixed_rates {
        return Ok(false);
    }
    checkpoint.start_struct(STRUCT_NAME);
    let stored = checkpoint.restore_array(RATES_KEY);
    checkpoint.end_struct();

    let Some(rates) = stored else {
        return Ok(false);
    };
    if rates.len() != topology.len() {
        return Err(EngineError::Checkpoint(format!(
            "expected {} partition rates, found {}",
            topology.len(),
            rates.len()
        )));
    }
    for (partition, rate) in topology.partitions.iter_mut().zip(rates) {
        partition.record.part_rate = rate;
    }
    topology.tree.map_trees();
    info!(partitions = topology.len(), "Partition rates restored from checkpoint.");
    Ok(true)
}
