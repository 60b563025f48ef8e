/// The tree-likelihood evaluator for the shared topology.
///
/// Implementations own the authoritative branch lengths. Partition subtrees derive their
/// lengths from them through the partition rate multipliers; keeping the two in sync is
/// the implementation's responsibility (see [`SharedTree::map_trees`]).
pub trait SharedTree: Send {
    /// Full recomputation of the joint log-likelihood over all partitions.
    fn compute_likelihood(&mut self) -> f64;

    /// Drops every cached partial likelihood so the next evaluation starts from scratch.
    fn clear_all_partial_lh(&mut self);

    fn branch_lengths(&self) -> Vec<f64>;

    fn branch_count(&self) -> usize;

    /// Multiplies every shared branch length by `factor`.
    fn scale_length(&mut self, factor: f64);

    /// Re-optimizes all branch lengths for at most `max_passes` sweeps, returning the
    /// joint log-likelihood.
    fn optimize_all_branches(&mut self, max_passes: usize, tolerance: f64) -> f64;

    /// Optimizes one global scaling factor of the tree length within `[min, max]`.
    /// `scaling` holds the starting point and receives the optimum.
    fn optimize_tree_length_scaling(
        &mut self,
        min: f64,
        scaling: &mut f64,
        max: f64,
        gradient_epsilon: f64,
    ) -> f64;

    /// Re-derives every partition subtree from the shared tree and the current rates.
    fn map_trees(&mut self);

    /// Newick representation annotated with branch lengths.
    fn to_newick(&self) -> String;
}

/// Free-parameter counts of one partition model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModelDimensions {
    pub rate_params: usize,      // Substitution-rate parameters
    pub frequency_params: usize, // Estimated state frequencies
    pub site_rate_params: usize, // Rate-heterogeneity parameters (shape, invariant proportion, ...)
}

impl ModelDimensions {
    pub fn new(rate_params: usize, frequency_params: usize, site_rate_params: usize) -> Self {
        Self {
            rate_params,
            frequency_params,
            site_rate_params,
        }
    }

    #[inline]
    pub fn total(&self) -> usize {
        self.rate_params + self.frequency_params + self.site_rate_params
    }
}

/// One partition's subtree together with its model factory.
pub trait PartitionModel: Send {
    /// Runs the model factory's own optimizer (substitution model and site rates).
    ///
    /// `current_score` is the partition's cached log-likelihood, or `0.0` when unknown.
    /// A return value of exactly `0.0` means the score was not evaluated.
    fn optimize_parameters_only(
        &mut self,
        step_budget: usize,
        gradient_epsilon: f64,
        current_score: f64,
    ) -> f64;

    fn compute_likelihood(&mut self) -> f64;

    /// Normalizes the rate matrix to a mean rate of 1.0 and returns the previous mean.
    fn rescale_rates(&mut self) -> f64;

    /// Multiplies the partition's branch lengths by `factor`.
    fn scale_length(&mut self, factor: f64);

    /// Optimizes the partition's tree-length multiplier within `[min, max]`.
    /// `scaling` holds the starting point and receives the optimum.
    fn optimize_tree_length_scaling(
        &mut self,
        min: f64,
        scaling: &mut f64,
        max: f64,
        gradient_epsilon: f64,
    ) -> f64;

    fn dimensions(&self) -> ModelDimensions;

    /// Relative cost of one likelihood evaluation, used to schedule large partitions first.
    /// `None` falls back to the partition's site count.
    fn work_estimate(&self) -> Option<f64> {
        None
    }

    /// Copies the shared parameter vector of the linked group `group` into this model.
    fn apply_linked_parameters(&mut self, group: &str, values: &[f64]);

    fn gamma_shape(&self) -> Option<f64>;

    fn set_gamma_shape(&mut self, alpha: f64);
}

/// A parameter vector tied across several partitions.
pub trait LinkedModel: Send {
    fn name(&self) -> &str;

    fn variables(&self) -> Vec<f64>;

    fn set_variables(&mut self, values: &[f64]);

    /// Lower and upper bounds, one entry per variable.
    fn bounds(&self) -> (Vec<f64>, Vec<f64>);

    fn n_dim(&self) -> usize;

    fn n_dim_freq(&self) -> usize;

    /// Sets the fixed flag and returns its previous value.
    fn fix_parameters(&mut self, fixed: bool) -> bool;

    fn info(&self) -> String;
}

/// Black-box bounded maximizer (Brent for one dimension, BFGS-style otherwise).
pub trait BoundedOptimizer: Sync {
    /// Maximizes `objective` over `x` within `[lower, upper]`, leaving the arg-max in `x`
    /// and returning the objective value there.
    fn maximize(
        &self,
        x: &mut [f64],
        lower: &[f64],
        upper: &[f64],
        gradient_epsilon: f64,
        objective: &mut dyn FnMut(&[f64]) -> f64,
    ) -> f64;
}
