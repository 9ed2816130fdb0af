//! Derived reports, computed on demand from a graph and a [`FlowResult`].

pub mod coverage;
pub mod decisions;
pub mod heatmap;
pub mod paths;

use serde::{Deserialize, Serialize};

use crate::data::{Choice, Scene};
use crate::result::FlowResult;

pub use coverage::{
    CoverageReport, RareScene, UnreachableReason, UnreachableScene, VisitClass, coverage_report,
};
pub use decisions::{ChoiceShare, DecisionDistribution, decision_distributions, normalized_entropy};
pub use heatmap::{ChoiceHeat, HeatBand, HeatmapData, SceneHeat, heatmap};
pub use paths::{PathStatistics, path_statistics};

/// A flow result bundled with every derived report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowReport {
    pub flow: FlowResult,
    pub coverage: CoverageReport,
    pub heatmap: HeatmapData,
    pub decisions: Vec<DecisionDistribution>,
    pub path_statistics: PathStatistics,
}

impl FlowReport {
    #[must_use]
    pub fn build(scenes: &[Scene], choices: &[Choice], flow: FlowResult) -> Self {
        Self {
            coverage: coverage_report(scenes, choices, &flow),
            heatmap: heatmap(scenes, choices, &flow),
            decisions: decision_distributions(scenes, choices, &flow),
            path_statistics: path_statistics(&flow),
            flow,
        }
    }
}
