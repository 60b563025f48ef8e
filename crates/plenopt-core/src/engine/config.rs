use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_NUM_PARAM_ITERATIONS: usize = 100;
pub const DEFAULT_MAX_BRANCH_LENGTH: f64 = 10.0;
pub const MIN_BRLEN_SCALE: f64 = 0.01;
pub const MAX_BRLEN_SCALE: f64 = 100.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: &'static str,
    },
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

/// How the shared branch lengths are treated in each outer round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchLengthMode {
    #[default]
    Optimize, // Full re-optimization of every branch
    Scale,    // One global tree-length scaling factor
    Fixed,    // Branch lengths are left untouched
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizerConfig {
    pub num_param_iterations: usize,
    pub max_branch_length: f64,
    pub min_brlen_scale: f64,
    pub max_brlen_scale: f64,
    pub max_branch_passes: usize,
    pub link_alpha: bool,
    pub num_threads: usize,
    pub linked_model_tolerance: f64,
    pub regression_tolerance: f64,
    pub rate_deviation_tolerance: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            num_param_iterations: DEFAULT_NUM_PARAM_ITERATIONS,
            max_branch_length: DEFAULT_MAX_BRANCH_LENGTH,
            min_brlen_scale: MIN_BRLEN_SCALE,
            max_brlen_scale: MAX_BRLEN_SCALE,
            max_branch_passes: 5,
            link_alpha: false,
            num_threads: 1,
            linked_model_tolerance: 0.1,
            regression_tolerance: 1.0,
            rate_deviation_tolerance: 1e-6,
        }
    }
}

impl OptimizerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Toml {
            path: "<inline>".to_string(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_param_iterations == 0 {
            return Err(invalid("num_param_iterations", "must be at least 1"));
        }
        if self.max_branch_passes == 0 {
            return Err(invalid("max_branch_passes", "must be at least 1"));
        }
        if self.num_threads == 0 {
            return Err(invalid("num_threads", "must be at least 1"));
        }
        for (name, value) in [
            ("max_branch_length", self.max_branch_length),
            ("min_brlen_scale", self.min_brlen_scale),
            ("max_brlen_scale", self.max_brlen_scale),
            ("linked_model_tolerance", self.linked_model_tolerance),
            ("regression_tolerance", self.regression_tolerance),
            ("rate_deviation_tolerance", self.rate_deviation_tolerance),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(name, "must be positive and finite"));
            }
        }
        if self.min_brlen_scale >= self.max_brlen_scale {
            return Err(invalid(
                "min_brlen_scale",
                "must be smaller than max_brlen_scale",
            ));
        }
        Ok(())
    }
}

fn invalid(name: &'static str, reason: &'static str) -> ConfigError {
    ConfigError::InvalidParameter { name, reason }
}

#[derive(Default)]
pub struct OptimizerConfigBuilder {
    num_param_iterations: Option<usize>,
    max_branch_length: Option<f64>,
    brlen_scale_bounds: Option<(f64, f64)>,
    max_branch_passes: Option<usize>,
    link_alpha: Option<bool>,
    num_threads: Option<usize>,
    regression_tolerance: Option<f64>,
}

impl OptimizerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_param_iterations(mut self, iterations: usize) -> Self {
        self.num_param_iterations = Some(iterations);
        self
    }
    pub fn max_branch_length(mut self, length: f64) -> Self {
        self.max_branch_length = Some(length);
        self
    }
    pub fn brlen_scale_bounds(mut self, min: f64, max: f64) -> Self {
        self.brlen_scale_bounds = Some((min, max));
        self
    }
    pub fn max_branch_passes(mut self, passes: usize) -> Self {
        self.max_branch_passes = Some(passes);
        self
    }
    pub fn link_alpha(mut self, link: bool) -> Self {
        self.link_alpha = Some(link);
        self
    }
    pub fn num_threads(mut self, threads: usize) -> Self {
        self.num_threads = Some(threads);
        self
    }
    pub fn regression_tolerance(mut self, tolerance: f64) -> Self {
        self.regression_tolerance = Some(tolerance);
        self
    }

    pub fn build(self) -> Result<OptimizerConfig, ConfigError> {
        let defaults = OptimizerConfig::default();
        let (min_brlen_scale, max_brlen_scale) = self
            .brlen_scale_bounds
            .unwrap_or((defaults.min_brlen_scale, defaults.max_brlen_scale));
        let config = OptimizerConfig {
            num_param_iterations: self
                .num_param_iterations
                .unwrap_or(defaults.num_param_iterations),
            max_branch_length: self.max_branch_length.unwrap_or(defaults.max_branch_length),
            min_brlen_scale,
            max_brlen_scale,
            max_branch_passes: self.max_branch_passes.unwrap_or(defaults.max_branch_passes),
            link_alpha: self.link_alpha.unwrap_or(defaults.link_alpha),
            num_threads: self.num_threads.unwrap_or(defaults.num_threads),
            regression_tolerance: self
                .regression_tolerance
                .unwrap_or(defaults.regression_tolerance),
            ..defaults
        };
        config.validate()?;
        Ok(config)
    }
}
