//! Aggregate analyzers over accumulated simulation counts.

use std::collections::HashMap;

use crate::data::Scene;
use crate::graph::GraphIndex;
use crate::numbers::{floor_f64_to_u32, ratio};
use crate::result::{Bottleneck, CriticalPath, DropOffPoint, FlowResult};

pub const CRITICAL_PATH_LIMIT: usize = 10;
pub const BOTTLENECK_SHARE: f64 = 0.8;
pub const DROP_OFF_MIN_SHARE: f64 = 0.1;
pub const DROP_OFF_EXIT_RATE: f64 = 0.3;

/// Display names by scene id; the first scene wins on duplicate ids.
pub(crate) fn scene_names(scenes: &[Scene]) -> HashMap<&str, &str> {
    let mut names = HashMap::with_capacity(scenes.len());
    for scene in scenes {
        names.entry(scene.id.as_str()).or_insert(scene.name.as_str());
    }
    names
}

/// Most frequent paths, count descending then key ascending.
#[must_use]
pub fn critical_paths(result: &FlowResult) -> Vec<CriticalPath> {
    let mut ranked: Vec<_> = result.path_frequencies.iter().collect();
    // BTreeMap iteration is key-ascending, so a stable sort keeps ties ordered.
    ranked.sort_by(|a, b| b.1.count.cmp(&a.1.count));
    ranked
        .into_iter()
        .take(CRITICAL_PATH_LIMIT)
        .map(|(_, tally)| CriticalPath {
            path: tally.scenes.clone(),
            frequency: tally.count,
            percentage: ratio(tally.count, result.iterations_completed) * 100.0,
        })
        .collect()
}

/// Scenes visited in more than 80% of runs.
#[must_use]
pub fn bottlenecks(scenes: &[Scene], index: &GraphIndex<'_>, result: &FlowResult) -> Vec<Bottleneck> {
    let runs = result.iterations_completed;
    if runs == 0 {
        return Vec::new();
    }
    let names = scene_names(scenes);
    (0..index.len())
        .map(|idx| index.scene_id(idx))
        .filter_map(|id| {
            let visits = result.visits(id);
            (f64::from(visits) > f64::from(runs) * BOTTLENECK_SHARE).then(|| Bottleneck {
                scene_id: id.to_string(),
                scene_name: names.get(id).copied().unwrap_or(id).to_string(),
                visits,
                throughput: ratio(visits, runs),
                required: result.reach(id) == runs,
            })
        })
        .collect()
}

/// Branching scenes with a high estimated exit rate.
///
/// Dead ends are natural endpoints and never reported.
#[must_use]
pub fn drop_off_points(
    scenes: &[Scene],
    index: &GraphIndex<'_>,
    result: &FlowResult,
) -> Vec<DropOffPoint> {
    let runs = result.iterations_completed;
    if runs == 0 {
        return Vec::new();
    }
    let names = scene_names(scenes);
    (0..index.len())
        .filter(|&idx| !index.outgoing(idx).is_empty())
        .map(|idx| index.scene_id(idx))
        .filter_map(|id| {
            let visits = result.visits(id);
            if f64::from(visits) < f64::from(runs) * DROP_OFF_MIN_SHARE {
                return None;
            }
            let exit_rate = (1.0 - ratio(visits, runs)).max(0.0);
            (exit_rate > DROP_OFF_EXIT_RATE).then(|| DropOffPoint {
                scene_id: id.to_string(),
                scene_name: names.get(id).copied().unwrap_or(id).to_string(),
                visits,
                exit_rate,
                estimated_exits: floor_f64_to_u32(f64::from(visits) * exit_rate),
            })
        })
        .collect()
}
