//! Simulation output types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Separator used to key paths by their joined scene ids.
pub const PATH_KEY_SEPARATOR: &str = "->";

/// One distinct traversal path and how often it occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathTally {
    pub scenes: Vec<String>,
    pub count: u32,
}

/// One of the most frequent full traversal paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalPath {
    pub path: Vec<String>,
    pub frequency: u32,
    pub percentage: f64,
}

/// A scene most runs pass through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bottleneck {
    pub scene_id: String,
    pub scene_name: String,
    pub visits: u32,
    pub throughput: f64,
    pub required: bool,
}

/// A branching scene with a high estimated exit rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropOffPoint {
    pub scene_id: String,
    pub scene_name: String,
    pub visits: u32,
    pub exit_rate: f64,
    pub estimated_exits: u32,
}

/// A choice whose target names no known scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DanglingTarget {
    pub choice_id: String,
    pub target_scene_id: String,
}

/// Inconsistencies found in the input graph; none of them abort a simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GraphDiagnostics {
    #[serde(default)]
    pub dangling_targets: Vec<DanglingTarget>,
    /// Ids of choices whose source scene is not in the scene list.
    #[serde(default)]
    pub unknown_sources: Vec<String>,
    #[serde(default)]
    pub unknown_start: bool,
}

impl GraphDiagnostics {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.dangling_targets.is_empty() && self.unknown_sources.is_empty() && !self.unknown_start
    }
}

/// Accumulated outcome of one simulation invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FlowResult {
    /// Seed that drove the run; recorded even when it was time-derived.
    pub seed: u64,
    pub start_scene_id: Option<String>,
    pub iterations: u32,
    pub iterations_completed: u32,
    pub truncated: bool,
    pub completed_runs: u32,
    /// Occurrences of each scene across all paths.
    pub scene_visits: BTreeMap<String, u32>,
    /// Runs that passed through each scene at least once.
    pub scene_reach: BTreeMap<String, u32>,
    pub choice_selections: BTreeMap<String, u32>,
    /// Distinct paths keyed by scene ids joined with [`PATH_KEY_SEPARATOR`].
    pub path_frequencies: BTreeMap<String, PathTally>,
    pub average_path_length: f64,
    pub median_path_length: usize,
    pub completion_rate: f64,
    pub drop_off_points: Vec<DropOffPoint>,
    pub critical_paths: Vec<CriticalPath>,
    pub bottlenecks: Vec<Bottleneck>,
    pub diagnostics: GraphDiagnostics,
}

impl FlowResult {
    /// All-zero result for a graph without an entry point.
    #[must_use]
    pub fn empty(iterations: u32, seed: u64) -> Self {
        Self {
            seed,
            iterations,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn visits(&self, scene_id: &str) -> u32 {
        self.scene_visits.get(scene_id).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn reach(&self, scene_id: &str) -> u32 {
        self.scene_reach.get(scene_id).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn selections(&self, choice_id: &str) -> u32 {
        self.choice_selections.get(choice_id).copied().unwrap_or(0)
    }

    /// Sum of all path counts; equals `iterations_completed`.
    #[must_use]
    pub fn total_paths(&self) -> u32 {
        self.path_frequencies.values().map(|tally| tally.count).sum()
    }

    /// Serialize the result as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[must_use]
pub fn path_key<S: AsRef<str>>(scenes: &[S]) -> String {
    let mut key = String::new();
    for (i, scene) in scenes.iter().enumerate() {
        if i > 0 {
            key.push_str(PATH_KEY_SEPARATOR);
        }
        key.push_str(scene.as_ref());
    }
    key
}
