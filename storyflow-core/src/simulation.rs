//! Monte Carlo orchestration: repeated traversals folded into a [`FlowResult`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crate::analysis;
use crate::config::{ExecutionMode, SimulationConfig, SimulationError};
use crate::data::{Choice, Scene};
use crate::graph::GraphIndex;
use crate::numbers::{ratio, usize_to_f64};
use crate::result::{FlowResult, GraphDiagnostics, PathTally, path_key};
use crate::seed::{LcgRng, derive_worker_seed, entropy_seed};
use crate::traversal::{Traversal, Traverser};

/// Cooperative cancellation flag, checked between iterations.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Run the simulation to completion.
///
/// A missing start scene yields an empty result rather than an error.
///
/// # Errors
///
/// Returns an error if the configuration violates its contract.
pub fn simulate(
    scenes: &[Scene],
    choices: &[Choice],
    start_scene_id: Option<&str>,
    config: &SimulationConfig,
) -> Result<FlowResult, SimulationError> {
    simulate_with_cancel(scenes, choices, start_scene_id, config, &CancelToken::new())
}

/// Run the simulation, stopping early once `cancel` is set.
///
/// A cancelled run returns the partial result with `truncated` set.
///
/// # Errors
///
/// Returns an error if the configuration violates its contract.
pub fn simulate_with_cancel(
    scenes: &[Scene],
    choices: &[Choice],
    start_scene_id: Option<&str>,
    config: &SimulationConfig,
    cancel: &CancelToken,
) -> Result<FlowResult, SimulationError> {
    config.validate()?;
    let seed = config.random_seed.unwrap_or_else(entropy_seed);

    let Some(start_id) = start_scene_id else {
        log::debug!("no start scene supplied; returning empty flow");
        return Ok(FlowResult::empty(config.iterations, seed));
    };

    let index = GraphIndex::build(scenes, choices, Some(start_id));
    report_diagnostics(index.diagnostics());
    let Some(start) = index.start() else {
        return Ok(FlowResult::empty(config.iterations, seed));
    };

    let accumulator = match config.execution {
        ExecutionMode::Sequential => {
            run_worker(&index, config, start, config.iterations, seed, cancel)
        }
        ExecutionMode::Parallel { workers } => {
            run_parallel(&index, config, start, workers, seed, cancel)
        }
    };

    let result =
        accumulator.into_result(scenes, choices, &index, config.iterations, seed, start_id);
    log::debug!(
        "simulated {}/{} runs from {start_id} ({}): {} distinct paths, completion {:.1}%",
        result.iterations_completed,
        result.iterations,
        config.behavior,
        result.path_frequencies.len(),
        result.completion_rate * 100.0
    );
    Ok(result)
}

fn report_diagnostics(diagnostics: &GraphDiagnostics) {
    for dangling in &diagnostics.dangling_targets {
        log::warn!(
            "choice {} targets unknown scene {}; treated as terminal",
            dangling.choice_id,
            dangling.target_scene_id
        );
    }
    for choice_id in &diagnostics.unknown_sources {
        log::warn!("choice {choice_id} leaves from a scene missing from the scene list");
    }
    if diagnostics.unknown_start {
        log::warn!("start scene is missing from the scene list");
    }
}

fn run_worker<'a>(
    index: &GraphIndex<'a>,
    config: &SimulationConfig,
    start: usize,
    iterations: u32,
    seed: u64,
    cancel: &CancelToken,
) -> Accumulator<'a> {
    let mut rng = LcgRng::new(seed);
    let mut traverser = Traverser::new(
        index,
        &config.behavior,
        config.revisit.budget(),
        config.max_steps,
    );
    let mut accumulator = Accumulator::new(index.len());
    for _ in 0..iterations {
        if cancel.is_cancelled() {
            break;
        }
        accumulator.record(&traverser.run(start, &mut rng));
    }
    accumulator
}

fn run_parallel<'a>(
    index: &GraphIndex<'a>,
    config: &SimulationConfig,
    start: usize,
    workers: u32,
    seed: u64,
    cancel: &CancelToken,
) -> Accumulator<'a> {
    // Workers beyond the iteration count would have nothing to run.
    let workers = workers.min(config.iterations);
    let base = config.iterations / workers;
    let extra = config.iterations % workers;

    let partials: Vec<Accumulator<'a>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                let share = base + u32::from(worker < extra);
                let worker_seed = derive_worker_seed(seed, worker);
                scope.spawn(move || run_worker(index, config, start, share, worker_seed, cancel))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            })
            .collect()
    });

    let mut merged = Accumulator::new(index.len());
    for partial in partials {
        merged.merge(partial);
    }
    merged
}

/// Per-worker counts keyed by interned scene index.
#[derive(Debug)]
struct Accumulator<'a> {
    runs: u32,
    completed: u32,
    visits: Vec<u32>,
    reach: Vec<u32>,
    reach_stamp: Vec<u32>,
    selections: HashMap<&'a str, u32>,
    paths: HashMap<Vec<usize>, u32>,
    lengths: Vec<usize>,
}

impl<'a> Accumulator<'a> {
    fn new(len: usize) -> Self {
        Self {
            runs: 0,
            completed: 0,
            visits: vec![0; len],
            reach: vec![0; len],
            reach_stamp: vec![0; len],
            selections: HashMap::new(),
            paths: HashMap::new(),
            lengths: Vec::new(),
        }
    }

    fn record(&mut self, traversal: &Traversal<'a>) {
        self.runs += 1;
        if traversal.outcome.is_completed() {
            self.completed += 1;
        }
        for &idx in &traversal.path {
            self.visits[idx] = self.visits[idx].saturating_add(1);
            if self.reach_stamp[idx] != self.runs {
                self.reach_stamp[idx] = self.runs;
                self.reach[idx] += 1;
            }
        }
        for &choice in &traversal.choices {
            let count = self.selections.entry(choice.id.as_str()).or_default();
            *count = count.saturating_add(1);
        }
        *self.paths.entry(traversal.path.clone()).or_default() += 1;
        self.lengths.push(traversal.path.len());
    }

    fn merge(&mut self, other: Self) {
        self.runs += other.runs;
        self.completed += other.completed;
        for (slot, count) in self.visits.iter_mut().zip(other.visits) {
            *slot = slot.saturating_add(count);
        }
        for (slot, count) in self.reach.iter_mut().zip(other.reach) {
            *slot += count;
        }
        for (id, count) in other.selections {
            let slot = self.selections.entry(id).or_default();
            *slot = slot.saturating_add(count);
        }
        for (path, count) in other.paths {
            *self.paths.entry(path).or_default() += count;
        }
        self.lengths.extend(other.lengths);
    }

    fn into_result(
        mut self,
        scenes: &[Scene],
        choices: &[Choice],
        index: &GraphIndex<'a>,
        iterations: u32,
        seed: u64,
        start_id: &str,
    ) -> FlowResult {
        let mut scene_visits = BTreeMap::new();
        let mut scene_reach = BTreeMap::new();
        for idx in 0..index.len() {
            if idx < index.known_len() || self.visits[idx] > 0 {
                let id = index.scene_id(idx).to_string();
                scene_visits.insert(id.clone(), self.visits[idx]);
                scene_reach.insert(id, self.reach[idx]);
            }
        }

        let choice_selections: BTreeMap<String, u32> = choices
            .iter()
            .map(|choice| {
                let count = self.selections.get(choice.id.as_str()).copied().unwrap_or(0);
                (choice.id.clone(), count)
            })
            .collect();

        let path_frequencies: BTreeMap<String, PathTally> = self
            .paths
            .into_iter()
            .map(|(path, count)| {
                let ids: Vec<String> = path
                    .iter()
                    .map(|&idx| index.scene_id(idx).to_string())
                    .collect();
                (path_key(&ids), PathTally { scenes: ids, count })
            })
            .collect();

        self.lengths.sort_unstable();
        let total_length: usize = self.lengths.iter().sum();
        let average_path_length = if self.lengths.is_empty() {
            0.0
        } else {
            usize_to_f64(total_length) / usize_to_f64(self.lengths.len())
        };
        let median_path_length = self.lengths.get(self.lengths.len() / 2).copied().unwrap_or(0);

        let mut result = FlowResult {
            seed,
            start_scene_id: Some(start_id.to_string()),
            iterations,
            iterations_completed: self.runs,
            truncated: self.runs < iterations,
            completed_runs: self.completed,
            scene_visits,
            scene_reach,
            choice_selections,
            path_frequencies,
            average_path_length,
            median_path_length,
            completion_rate: ratio(self.completed, self.runs),
            diagnostics: index.diagnostics().clone(),
            ..FlowResult::default()
        };
        result.critical_paths = analysis::critical_paths(&result);
        result.bottlenecks = analysis::bottlenecks(scenes, index, &result);
        result.drop_off_points = analysis::drop_off_points(scenes, index, &result);
        result
    }
}
