use std::collections::BTreeMap;
use std::hash::Hasher;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use storyflow_core::{
    BehaviorModel, Choice, ExecutionMode, FlowResult, RevisitPolicy, Scene, SimulationConfig,
    coverage_report, decision_distributions, heatmap, path_statistics, simulate,
};
use twox_hash::XxHash64;

/// Random graph with forward edges, back edges, self loops, terminal and dangling choices.
fn random_graph(seed: u64, scene_count: usize) -> (Vec<Scene>, Vec<Choice>) {
    let mut rng = SmallRng::seed_from_u64(seed);
    let scenes: Vec<Scene> = (0..scene_count)
        .map(|i| Scene::new(format!("s{i}"), format!("Scene {i}")))
        .collect();
    let mut choices = Vec::new();
    for i in 0..scene_count {
        let fanout = rng.gen_range(0..4);
        for k in 0..fanout {
            let id = format!("s{i}-c{k}");
            let source = format!("s{i}");
            let roll: f64 = rng.r#gen();
            let target = if roll < 0.1 {
                None
            } else if roll < 0.15 {
                Some("missing".to_string())
            } else {
                Some(format!("s{}", rng.gen_range(0..scene_count)))
            };
            let label = "x".repeat(rng.gen_range(1..40));
            choices.push(Choice::new(id, source, label, target.as_deref()));
        }
    }
    (scenes, choices)
}

fn behaviors() -> Vec<BehaviorModel> {
    vec![
        BehaviorModel::Uniform,
        BehaviorModel::Weighted {
            weights: BTreeMap::from([("s0-c0".to_string(), 4.0), ("s1-c1".to_string(), 0.5)]),
        },
        BehaviorModel::Exploration { factor: 0.7 },
        BehaviorModel::Optimal,
    ]
}

fn fingerprint(result: &FlowResult) -> u64 {
    let bytes = serde_json::to_vec(result).unwrap();
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(&bytes);
    hasher.finish()
}

#[test]
fn seeded_runs_are_byte_identical() {
    for graph_seed in 0..6 {
        let (scenes, choices) = random_graph(graph_seed, 12);
        for behavior in behaviors() {
            let cfg = SimulationConfig::new(300, behavior).with_seed(graph_seed * 31 + 7);
            let first = simulate(&scenes, &choices, Some("s0"), &cfg).unwrap();
            let second = simulate(&scenes, &choices, Some("s0"), &cfg).unwrap();
            assert_eq!(
                serde_json::to_vec(&first).unwrap(),
                serde_json::to_vec(&second).unwrap()
            );
            assert_eq!(fingerprint(&first), fingerprint(&second));
        }
    }
}

#[test]
fn different_seeds_usually_diverge() {
    let (scenes, choices) = random_graph(3, 16);
    let fingerprints: Vec<u64> = (0..8)
        .map(|seed| {
            let cfg = SimulationConfig::new(500, BehaviorModel::Uniform).with_seed(seed);
            fingerprint(&simulate(&scenes, &choices, Some("s0"), &cfg).unwrap())
        })
        .collect();
    let distinct: std::collections::HashSet<_> = fingerprints.iter().collect();
    assert!(distinct.len() > 1);
}

#[test]
fn counts_are_conserved_and_rates_bounded() {
    for graph_seed in 0..10 {
        let (scenes, choices) = random_graph(graph_seed, 15);
        for (i, behavior) in behaviors().into_iter().enumerate() {
            let iterations = 250;
            let cfg = SimulationConfig::new(iterations, behavior)
                .with_seed(graph_seed + i as u64)
                .with_revisit(if i % 2 == 0 {
                    RevisitPolicy::SinglePass
                } else {
                    RevisitPolicy::VisitBudget {
                        max_visits_per_scene: 2,
                    }
                });
            let result = simulate(&scenes, &choices, Some("s0"), &cfg).unwrap();

            assert_eq!(result.total_paths(), iterations);
            assert!(result.completed_runs <= iterations);
            assert!((0.0..=1.0).contains(&result.completion_rate));
            let rebuilt = result.completion_rate * f64::from(iterations);
            assert!((rebuilt - rebuilt.round()).abs() < 1e-6);
            assert_eq!(result.reach("s0"), iterations);
            assert!(result.visits("s0") >= iterations);

            let visit_sum: u32 = result.scene_visits.values().sum();
            let path_scene_sum: u32 = result
                .path_frequencies
                .values()
                .map(|tally| tally.scenes.len() as u32 * tally.count)
                .sum();
            assert_eq!(visit_sum, path_scene_sum);

            let selection_sum: u32 = result.choice_selections.values().sum();
            assert_eq!(selection_sum + iterations, path_scene_sum);

            let stats = path_statistics(&result);
            assert_eq!(stats.total_paths, iterations);
            assert!(stats.min_length as f64 <= stats.mean_length);
            assert!(stats.mean_length <= stats.max_length as f64);
            assert!((stats.mean_length - result.average_path_length).abs() < 1e-9);
            assert_eq!(stats.median_length, result.median_path_length);
        }
    }
}

#[test]
fn coverage_partitions_every_scene() {
    for graph_seed in 0..10 {
        let (scenes, choices) = random_graph(graph_seed, 14);
        let cfg = SimulationConfig::new(200, BehaviorModel::Uniform).with_seed(graph_seed);
        let result = simulate(&scenes, &choices, Some("s0"), &cfg).unwrap();
        let report = coverage_report(&scenes, &choices, &result);

        assert!((0.0..=100.0).contains(&report.coverage_percentage));
        assert_eq!(report.classes.len(), scenes.len());
        let classified = report.unreachable_scenes.len()
            + report.never_visited.len()
            + report.rarely_visited.len()
            + report
                .classes
                .values()
                .filter(|class| matches!(class, storyflow_core::metrics::VisitClass::Normal))
                .count();
        assert_eq!(classified, scenes.len());
        assert_eq!(
            report.depth_distribution.values().sum::<usize>(),
            report.reachable_scenes
        );
        for unreachable in &report.unreachable_scenes {
            assert_eq!(result.visits(&unreachable.scene_id), 0);
        }
    }
}

#[test]
fn entropy_and_heat_stay_in_unit_range() {
    for graph_seed in 0..10 {
        let (scenes, choices) = random_graph(graph_seed, 12);
        let cfg = SimulationConfig::new(300, BehaviorModel::Exploration { factor: 0.4 })
            .with_seed(graph_seed);
        let result = simulate(&scenes, &choices, Some("s0"), &cfg).unwrap();

        for dist in decision_distributions(&scenes, &choices, &result) {
            assert!((0.0..=1.0).contains(&dist.entropy), "entropy {}", dist.entropy);
            if dist.choices.len() == 1 {
                assert!((dist.entropy - 0.0).abs() < f64::EPSILON);
            }
            if dist.total_decisions > 0 {
                let pct: f64 = dist.choices.iter().map(|c| c.percentage).sum();
                assert!((pct - 100.0).abs() < 1e-6);
            }
        }

        let heat = heatmap(&scenes, &choices, &result);
        assert!(heat.scenes.iter().all(|s| (0.0..=1.0).contains(&s.heat)));
        assert!(heat.choices.iter().all(|c| (0.0..=1.0).contains(&c.heat)));
    }
}

#[test]
fn parallel_mode_is_stable_per_worker_count() {
    let (scenes, choices) = random_graph(5, 20);
    let base = SimulationConfig::new(999, BehaviorModel::Uniform).with_seed(77);
    let two = base
        .clone()
        .with_execution(ExecutionMode::Parallel { workers: 2 });
    let three = base.clone().with_execution(ExecutionMode::Parallel { workers: 3 });

    let a = simulate(&scenes, &choices, Some("s0"), &two).unwrap();
    let b = simulate(&scenes, &choices, Some("s0"), &two).unwrap();
    let c = simulate(&scenes, &choices, Some("s0"), &three).unwrap();

    assert_eq!(fingerprint(&a), fingerprint(&b));
    assert_eq!(a.total_paths(), 999);
    assert_eq!(c.total_paths(), 999);
    assert_eq!(a.seed, 77);

    let one = base.with_execution(ExecutionMode::Parallel { workers: 1 });
    let single_worker = simulate(&scenes, &choices, Some("s0"), &one).unwrap();
    assert_eq!(single_worker.total_paths(), 999);
}
