use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::behavior::BehaviorModel;

/// Default per-run step cap.
pub const DEFAULT_MAX_STEPS: u32 = 1_000;

/// Errors raised when a simulation configuration violates its contract.
#[derive(Debug, Error, PartialEq)]
pub enum SimulationError {
    #[error("iterations must be greater than zero")]
    ZeroIterations,
    #[error("exploration factor must be between 0.00 and 1.00 (got {factor:.2})")]
    ExplorationFactorOutOfRange { factor: f64 },
    #[error("weight for choice {choice_id} must be finite and non-negative (got {weight})")]
    InvalidWeight { choice_id: String, weight: f64 },
    #[error("visit budget must allow at least one visit per scene")]
    ZeroVisitBudget,
    #[error("max_steps must be greater than zero")]
    ZeroMaxSteps,
    #[error("parallel execution needs at least one worker")]
    ZeroWorkers,
}

/// How often a single run may enter the same scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RevisitPolicy {
    /// Each scene appears at most once per run.
    #[default]
    SinglePass,
    /// Each scene may be entered up to `max_visits_per_scene` times per run.
    VisitBudget { max_visits_per_scene: u32 },
}

impl RevisitPolicy {
    /// Visits allowed per scene within one run.
    #[must_use]
    pub const fn budget(self) -> u32 {
        match self {
            Self::SinglePass => 1,
            Self::VisitBudget {
                max_visits_per_scene,
            } => max_visits_per_scene,
        }
    }
}

/// Threading strategy for the iteration loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One generator, one continuous draw sequence.
    #[default]
    Sequential,
    /// Iterations split across workers, each with a derived sub-seed.
    /// Deterministic per seed and worker count, but a different draw
    /// sequence than `Sequential`.
    Parallel { workers: u32 },
}

/// Configuration for a simulation invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub iterations: u32,
    #[serde(default)]
    pub behavior: BehaviorModel,
    #[serde(default)]
    pub random_seed: Option<u64>,
    #[serde(default)]
    pub revisit: RevisitPolicy,
    #[serde(default = "SimulationConfig::default_max_steps")]
    pub max_steps: u32,
    #[serde(default)]
    pub execution: ExecutionMode,
}

impl SimulationConfig {
    #[must_use]
    pub fn new(iterations: u32, behavior: BehaviorModel) -> Self {
        Self {
            iterations,
            behavior,
            random_seed: None,
            revisit: RevisitPolicy::default(),
            max_steps: DEFAULT_MAX_STEPS,
            execution: ExecutionMode::default(),
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_revisit(mut self, revisit: RevisitPolicy) -> Self {
        self.revisit = revisit;
        self
    }

    #[must_use]
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    #[must_use]
    pub fn with_execution(mut self, execution: ExecutionMode) -> Self {
        self.execution = execution;
        self
    }

    const fn default_max_steps() -> u32 {
        DEFAULT_MAX_STEPS
    }

    /// Check the configuration contract.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.iterations == 0 {
            return Err(SimulationError::ZeroIterations);
        }
        match &self.behavior {
            BehaviorModel::Exploration { factor } if !(0.0..=1.0).contains(factor) => {
                return Err(SimulationError::ExplorationFactorOutOfRange { factor: *factor });
            }
            BehaviorModel::Weighted { weights } => {
                if let Some((choice_id, weight)) = weights
                    .iter()
                    .find(|(_, weight)| !weight.is_finite() || **weight < 0.0)
                {
                    return Err(SimulationError::InvalidWeight {
                        choice_id: choice_id.clone(),
                        weight: *weight,
                    });
                }
            }
            _ => {}
        }
        if self.revisit.budget() == 0 {
            return Err(SimulationError::ZeroVisitBudget);
        }
        if self.max_steps == 0 {
            return Err(SimulationError::ZeroMaxSteps);
        }
        if matches!(self.execution, ExecutionMode::Parallel { workers: 0 }) {
            return Err(SimulationError::ZeroWorkers);
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new(1_000, BehaviorModel::Uniform)
    }
}
