use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::Choice;
use crate::numbers::{unit_to_index, usize_to_f64};
use crate::seed::LcgRng;

const DEFAULT_WEIGHT: f64 = 1.0;

/// Simulated player behavior used to pick among valid choices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BehaviorModel {
    /// Every valid choice is equally likely.
    #[default]
    Uniform,
    /// Per-choice weights; choices missing from the map weigh 1.0.
    Weighted {
        #[serde(default)]
        weights: BTreeMap<String, f64>,
    },
    /// Bias toward later-listed choices as `factor` approaches 1.
    Exploration { factor: f64 },
    /// Always take the first valid choice.
    Optimal,
}

impl BehaviorModel {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Uniform => "Uniform",
            Self::Weighted { .. } => "Weighted",
            Self::Exploration { .. } => "Exploration",
            Self::Optimal => "Optimal",
        }
    }

    /// Select an index into `candidates`.
    ///
    /// Callers guarantee `candidates` is non-empty. `Optimal` draws nothing;
    /// every other model consumes exactly one sample.
    pub fn pick_index(&self, candidates: &[&Choice], rng: &mut LcgRng) -> usize {
        match self {
            Self::Uniform => unit_to_index(rng.next_f64(), candidates.len()),
            Self::Weighted { weights } => {
                let resolved: Vec<f64> = candidates
                    .iter()
                    .map(|choice| weights.get(&choice.id).copied().unwrap_or(DEFAULT_WEIGHT))
                    .collect();
                sample_weighted(&resolved, rng.next_f64())
            }
            Self::Exploration { factor } => {
                let resolved = exploration_weights(*factor, candidates.len());
                sample_weighted(&resolved, rng.next_f64())
            }
            Self::Optimal => 0,
        }
    }
}

impl fmt::Display for BehaviorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exploration { factor } => write!(f, "{} ({factor:.2})", self.label()),
            Self::Weighted { weights } => write!(f, "{} ({} weights)", self.label(), weights.len()),
            _ => f.write_str(self.label()),
        }
    }
}

/// Linear ramp from `1 - factor` at the first candidate to `1 + factor` at the last.
#[must_use]
pub fn exploration_weights(factor: f64, len: usize) -> Vec<f64> {
    if len <= 1 {
        return vec![1.0; len];
    }
    let span = usize_to_f64(len - 1);
    (0..len)
        .map(|i| (1.0 - factor) + factor * 2.0 * (usize_to_f64(i) / span))
        .collect()
}

/// Cumulative sampling of normalized `weights` against one `sample`.
///
/// A non-positive total falls back to a uniform pick on the same sample.
fn sample_weighted(weights: &[f64], sample: f64) -> usize {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return unit_to_index(sample, weights.len());
    }
    let mut cumulative = 0.0;
    for (idx, weight) in weights.iter().enumerate() {
        cumulative += weight / total;
        if sample < cumulative {
            return idx;
        }
    }
    weights
        .iter()
        .rposition(|weight| *weight > 0.0)
        .unwrap_or(weights.len().saturating_sub(1))
}
