//! Deterministic collaborators with known optima for the engine and workflow tests.
//!
//! Every partition likelihood is a sum of concave quadratic penalties around fixed targets.
//! The partitions publish their current terms to a shared [`Ledger`], which plays the role
//! of the joint likelihood evaluator behind [`StubTree`].

use crate::core::collaborators::{
    BoundedOptimizer, LinkedModel, ModelDimensions, PartitionModel, SharedTree,
};
use crate::core::models::partition::{Partition, SeqType};
use std::sync::{Arc, Mutex};

const GOLDEN_RATIO: f64 = 1.618_033_988_749_895;

#[derive(Debug)]
struct LedgerState {
    own: Vec<f64>,
    branch_bonus: f64,
    tree_scale: f64,
}

/// Shared view of the per-partition terms and the branch-length contribution.
#[derive(Debug, Clone)]
pub struct Ledger(Arc<Mutex<LedgerState>>);

impl Ledger {
    fn new(partitions: usize) -> Self {
        Self(Arc::new(Mutex::new(LedgerState {
            own: vec![0.0; partitions],
            branch_bonus: 0.0,
            tree_scale: 1.0,
        })))
    }

    fn with<R>(&self, f: impl FnOnce(&mut LedgerState) -> R) -> R {
        let mut state = self.0.lock().unwrap();
        f(&mut state)
    }

    fn publish(&self, index: usize, own: f64) -> f64 {
        self.with(|state| {
            state.own[index] = own;
            own + state.branch_bonus / state.own.len() as f64
        })
    }

    fn tree_scale(&self) -> f64 {
        self.with(|state| state.tree_scale)
    }

    /// Current log-likelihood of every partition.
    pub fn likelihoods(&self) -> Vec<f64> {
        self.with(|state| {
            let share = state.branch_bonus / state.own.len() as f64;
            state.own.iter().map(|own| own + share).collect()
        })
    }

    /// Joint log-likelihood over all partitions.
    pub fn total(&self) -> f64 {
        self.with(|state| state.own.iter().sum::<f64>() + state.branch_bonus)
    }
}

#[derive(Debug, Clone)]
pub struct StubTree {
    pub ledger: Ledger,
    branch_lengths: Vec<f64>,
    pub remap_calls: usize,
    pub clear_calls: usize,
    pub branch_calls: usize,
    pub length_scalings: Vec<f64>,
    pub last_branch_passes: Option<usize>,
    pub last_scaling_bounds: Option<(f64, f64)>,
    pub branch_gain: f64, // Bonus that branch optimization converges to
    pub branch_drop: f64, // Subtracted on every branch optimization
}

impl StubTree {
    pub fn set_branch_lengths(&mut self, lengths: Vec<f64>) {
        self.branch_lengths = lengths;
    }
}

impl SharedTree for StubTree {
    fn compute_likelihood(&mut self) -> f64 {
        self.ledger.total()
    }

    fn clear_all_partial_lh(&mut self) {
        self.clear_calls += 1;
    }

    fn branch_lengths(&self) -> Vec<f64> {
        self.branch_lengths.clone()
    }

    fn branch_count(&self) -> usize {
        self.branch_lengths.len()
    }

    fn scale_length(&mut self, factor: f64) {
        self.length_scalings.push(factor);
        for length in &mut self.branch_lengths {
            *length *= factor;
        }
        self.ledger.with(|state| state.tree_scale *= factor);
    }

    fn optimize_all_branches(&mut self, max_passes: usize, _tolerance: f64) -> f64 {
        self.branch_calls += 1;
        self.last_branch_passes = Some(max_passes);
        let (gain, loss) = (self.branch_gain, self.branch_drop);
        self.ledger.with(|state| {
            state.branch_bonus += 0.5 * (gain - state.branch_bonus) - loss;
        });
        self.ledger.total()
    }

    fn optimize_tree_length_scaling(
        &mut self,
        min: f64,
        scaling: &mut f64,
        max: f64,
        _gradient_epsilon: f64,
    ) -> f64 {
        self.last_scaling_bounds = Some((min, max));
        *scaling = scaling.clamp(min, max);
        self.ledger.total()
    }

    fn map_trees(&mut self) {
        self.remap_calls += 1;
    }

    fn to_newick(&self) -> String {
        let leaves: Vec<String> = self
            .branch_lengths
            .iter()
            .enumerate()
            .map(|(i, length)| format!("t{i}:{length}"))
            .collect();
        format!("({});", leaves.join(","))
    }
}

#[derive(Debug, Clone)]
pub struct StubModel {
    index: usize,
    ledger: Ledger,
    base: f64,
    weight: f64,
    param: f64,
    offset: f64,
    effective_rate: f64,

    pub param_target: f64,
    pub target_rate: f64,
    pub linked_target: Option<f64>,
    pub linked_values: Option<Vec<f64>>,
    pub alpha: Option<f64>,
    pub alpha_target: Option<f64>,
    pub dims: ModelDimensions,
    pub work_estimate: Option<f64>,

    pub report_unevaluated: bool,
    pub pending_mean_rate: Option<f64>,
    pub step_penalty: f64,    // Lost on every model optimization call
    pub scaling_penalty: f64, // Lost on every rate optimization call

    pub likelihood_calls: usize,
    pub last_gradient_epsilon: f64,
    pub last_step_budget: usize,
    pub last_scaling_bounds: Option<(f64, f64)>,
    pub length_scalings: Vec<f64>,
}

impl StubModel {
    fn new(index: usize, ledger: Ledger, site_count: usize) -> Self {
        Self {
            index,
            ledger,
            base: -2.0 * site_count as f64,
            weight: site_count as f64 / 10.0,
            param: 0.0,
            offset: 0.0,
            effective_rate: 1.0,
            param_target: 1.0,
            target_rate: 1.0,
            linked_target: None,
            linked_values: None,
            alpha: None,
            alpha_target: None,
            dims: ModelDimensions::new(5, 3, 1),
            work_estimate: None,
            report_unevaluated: false,
            pending_mean_rate: None,
            step_penalty: 0.0,
            scaling_penalty: 0.0,
            likelihood_calls: 0,
            last_gradient_epsilon: 0.0,
            last_step_budget: 0,
            last_scaling_bounds: None,
            length_scalings: Vec::new(),
        }
    }

    fn own_terms(&self) -> f64 {
        let mut lnl = self.base + self.offset;
        lnl -= self.weight * (self.param - self.param_target).powi(2);
        lnl -= self.weight * (self.effective_rate - self.target_rate).powi(2);
        if let Some(target) = self.linked_target {
            let value = self
                .linked_values
                .as_ref()
                .and_then(|v| v.first().copied())
                .unwrap_or(0.0);
            lnl -= (value - target).powi(2);
        }
        if let (Some(alpha), Some(target)) = (self.alpha, self.alpha_target) {
            lnl -= (alpha - target).powi(2);
        }
        lnl
    }

    fn evaluate(&mut self) -> f64 {
        let own = self.own_terms();
        self.ledger.publish(self.index, own)
    }
}

impl PartitionModel for StubModel {
    fn optimize_parameters_only(
        &mut self,
        step_budget: usize,
        gradient_epsilon: f64,
        _current_score: f64,
    ) -> f64 {
        self.last_step_budget = step_budget;
        self.last_gradient_epsilon = gradient_epsilon;
        self.param += 0.5 * (self.param_target - self.param);
        self.offset -= self.step_penalty;
        let lnl = self.evaluate();
        if self.report_unevaluated { 0.0 } else { lnl }
    }

    fn compute_likelihood(&mut self) -> f64 {
        self.likelihood_calls += 1;
        self.evaluate()
    }

    fn rescale_rates(&mut self) -> f64 {
        self.pending_mean_rate.take().unwrap_or(1.0)
    }

    fn scale_length(&mut self, factor: f64) {
        self.length_scalings.push(factor);
    }

    fn optimize_tree_length_scaling(
        &mut self,
        min: f64,
        scaling: &mut f64,
        max: f64,
        _gradient_epsilon: f64,
    ) -> f64 {
        self.last_scaling_bounds = Some((min, max));
        let tree_scale = self.ledger.tree_scale();
        *scaling = (self.target_rate / tree_scale).clamp(min, max);
        self.effective_rate = *scaling * tree_scale;
        self.offset -= self.scaling_penalty;
        self.evaluate()
    }

    fn dimensions(&self) -> ModelDimensions {
        self.dims
    }

    fn work_estimate(&self) -> Option<f64> {
        self.work_estimate
    }

    fn apply_linked_parameters(&mut self, _group: &str, values: &[f64]) {
        self.linked_values = Some(values.to_vec());
    }

    fn gamma_shape(&self) -> Option<f64> {
        self.alpha
    }

    fn set_gamma_shape(&mut self, alpha: f64) {
        self.alpha = Some(alpha);
    }
}

/// Builds a tree and one stub partition per `(site_count, seq_type)` entry, with every
/// initial likelihood already published.
pub fn fixture(sites: &[(usize, SeqType)]) -> (StubTree, Vec<Partition<StubModel>>) {
    let ledger = Ledger::new(sites.len());
    let partitions = sites
        .iter()
        .enumerate()
        .map(|(index, &(site_count, seq_type))| {
            let mut model = StubModel::new(index, ledger.clone(), site_count);
            model.evaluate();
            Partition::new(model, site_count, seq_type)
        })
        .collect();
    let tree = StubTree {
        ledger,
        branch_lengths: vec![0.1, 0.2, 0.05, 0.15, 0.3],
        remap_calls: 0,
        clear_calls: 0,
        branch_calls: 0,
        length_scalings: Vec::new(),
        last_branch_passes: None,
        last_scaling_bounds: None,
        branch_gain: 2.0,
        branch_drop: 0.0,
    };
    (tree, partitions)
}

#[derive(Debug, Clone)]
pub struct StubLinkedModel {
    name: String,
    variables: Vec<f64>,
    pub freq_dims: usize,
    pub fixed: bool,
    pub bounds: (f64, f64), // Applied to every variable
}

impl StubLinkedModel {
    pub fn new(name: &str, variables: Vec<f64>) -> Self {
        Self {
            name: name.to_string(),
            variables,
            freq_dims: 0,
            fixed: false,
            bounds: (0.0, 10.0),
        }
    }
}

impl LinkedModel for StubLinkedModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn variables(&self) -> Vec<f64> {
        self.variables.clone()
    }

    fn set_variables(&mut self, values: &[f64]) {
        self.variables = values.to_vec();
    }

    fn bounds(&self) -> (Vec<f64>, Vec<f64>) {
        let n = self.variables.len();
        (vec![self.bounds.0; n], vec![self.bounds.1; n])
    }

    fn n_dim(&self) -> usize {
        if self.fixed { 0 } else { self.variables.len() }
    }

    fn n_dim_freq(&self) -> usize {
        if self.fixed { 0 } else { self.freq_dims }
    }

    fn fix_parameters(&mut self, fixed: bool) -> bool {
        std::mem::replace(&mut self.fixed, fixed)
    }

    fn info(&self) -> String {
        format!("Linked model {}: {:?}", self.name, self.variables)
    }
}

/// Coordinate-wise golden-section search. Never returns a point worse than the start.
#[derive(Debug, Clone)]
pub struct GoldenSectionOptimizer {
    pub tolerance: f64,
    pub sweeps: usize,
}

impl Default for GoldenSectionOptimizer {
    fn default() -> Self {
        Self {
            tolerance: 1e-7,
            sweeps: 3,
        }
    }
}

impl BoundedOptimizer for GoldenSectionOptimizer {
    fn maximize(
        &self,
        x: &mut [f64],
        lower: &[f64],
        upper: &[f64],
        _gradient_epsilon: f64,
        objective: &mut dyn FnMut(&[f64]) -> f64,
    ) -> f64 {
        let start = x.to_vec();
        let start_value = objective(&start);
        let mut point = start.clone();

        for _ in 0..self.sweeps {
            for dim in 0..point.len() {
                let (mut a, mut b) = (lower[dim], upper[dim]);
                while b - a > self.tolerance {
                    let c = b - (b - a) / GOLDEN_RATIO;
                    let d = a + (b - a) / GOLDEN_RATIO;
                    point[dim] = c;
                    let fc = objective(&point);
                    point[dim] = d;
                    let fd = objective(&point);
                    if fc > fd {
                        b = d;
                    } else {
                        a = c;
                    }
                }
                point[dim] = 0.5 * (a + b);
            }
        }

        let best = objective(&point);
        if best >= start_value {
            x.copy_from_slice(&point);
            best
        } else {
            x.copy_from_slice(&start);
            objective(&start)
        }
    }
}
