//! Reachability and visit coverage from the start scene.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analysis::scene_names;
use crate::data::{Choice, Scene};
use crate::graph::GraphIndex;
use crate::numbers::{u64_to_f64, usize_to_f64};
use crate::result::FlowResult;

const RARE_SHARE_OF_MEAN: f64 = 0.1;

/// Exactly one class applies to every scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitClass {
    Orphaned,
    NeverVisited,
    RarelyVisited,
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnreachableReason {
    /// No path of choices leads here from the start scene.
    Orphaned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreachableScene {
    pub scene_id: String,
    pub scene_name: String,
    pub reason: UnreachableReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RareScene {
    pub scene_id: String,
    pub scene_name: String,
    pub visits: u32,
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub total_scenes: usize,
    pub reachable_scenes: usize,
    pub visited_scenes: usize,
    /// Visited reachable scenes over reachable scenes, 0..=100.
    pub coverage_percentage: f64,
    pub never_visited: Vec<String>,
    pub rarely_visited: Vec<RareScene>,
    pub unreachable_scenes: Vec<UnreachableScene>,
    /// Reachable scenes per BFS depth from the start scene.
    pub depth_distribution: BTreeMap<usize, usize>,
    pub max_depth: usize,
    pub classes: BTreeMap<String, VisitClass>,
}

#[must_use]
pub fn coverage_report(scenes: &[Scene], choices: &[Choice], result: &FlowResult) -> CoverageReport {
    let index = GraphIndex::build(scenes, choices, result.start_scene_id.as_deref());
    let depths = index
        .start()
        .map_or_else(|| vec![None; index.len()], |start| index.depths_from(start));
    let names = scene_names(scenes);

    let known: Vec<(&str, Option<usize>, u32)> = (0..index.known_len())
        .map(|idx| {
            let id = index.scene_id(idx);
            (id, depths[idx], result.visits(id))
        })
        .collect();

    let (nonzero_total, nonzero_count) = known
        .iter()
        .filter(|(_, _, visits)| *visits > 0)
        .fold((0_u64, 0_usize), |(sum, n), (_, _, visits)| {
            (sum + u64::from(*visits), n + 1)
        });
    let rare_threshold = if nonzero_count == 0 {
        0.0
    } else {
        u64_to_f64(nonzero_total) / usize_to_f64(nonzero_count) * RARE_SHARE_OF_MEAN
    };

    let mut report = CoverageReport {
        total_scenes: known.len(),
        reachable_scenes: 0,
        visited_scenes: 0,
        coverage_percentage: 0.0,
        never_visited: Vec::new(),
        rarely_visited: Vec::new(),
        unreachable_scenes: Vec::new(),
        depth_distribution: BTreeMap::new(),
        max_depth: 0,
        classes: BTreeMap::new(),
    };
    for &(id, depth, visits) in &known {
        let name = names.get(id).copied().unwrap_or(id).to_string();
        let class = match depth {
            None => {
                report.unreachable_scenes.push(UnreachableScene {
                    scene_id: id.to_string(),
                    scene_name: name,
                    reason: UnreachableReason::Orphaned,
                });
                VisitClass::Orphaned
            }
            Some(depth) => {
                report.reachable_scenes += 1;
                *report.depth_distribution.entry(depth).or_default() += 1;
                report.max_depth = report.max_depth.max(depth);
                if visits == 0 {
                    report.never_visited.push(id.to_string());
                    VisitClass::NeverVisited
                } else {
                    report.visited_scenes += 1;
                    if f64::from(visits) < rare_threshold {
                        report.rarely_visited.push(RareScene {
                            scene_id: id.to_string(),
                            scene_name: name,
                            visits,
                            depth,
                        });
                        VisitClass::RarelyVisited
                    } else {
                        VisitClass::Normal
                    }
                }
            }
        };
        report.classes.insert(id.to_string(), class);
    }

    if report.reachable_scenes > 0 {
        report.coverage_percentage = usize_to_f64(report.visited_scenes)
            / usize_to_f64(report.reachable_scenes)
            * 100.0;
    }
    report
}
