//! Single simulated playthrough over a [`GraphIndex`].

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::behavior::BehaviorModel;
use crate::data::Choice;
use crate::graph::GraphIndex;
use crate::seed::LcgRng;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunOutcome {
    /// Reached a scene with no outgoing choices.
    Completed,
    /// Every outgoing choice was terminal, dangling, or exhausted its visit budget.
    Stuck,
    /// Hit the per-run step cap.
    StepCap,
}

impl RunOutcome {
    #[must_use]
    pub const fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Visited scenes (as interned indices) and chosen edges of one run.
#[derive(Debug, Clone)]
pub struct Traversal<'a> {
    pub path: Vec<usize>,
    pub choices: Vec<&'a Choice>,
    pub outcome: RunOutcome,
}

/// Reusable traversal driver; keeps a per-run visit scratch buffer.
#[derive(Debug)]
pub struct Traverser<'g, 'a> {
    index: &'g GraphIndex<'a>,
    behavior: &'g BehaviorModel,
    visit_budget: u32,
    max_steps: u32,
    visits: Vec<u32>,
}

impl<'g, 'a> Traverser<'g, 'a> {
    #[must_use]
    pub fn new(
        index: &'g GraphIndex<'a>,
        behavior: &'g BehaviorModel,
        visit_budget: u32,
        max_steps: u32,
    ) -> Self {
        Self {
            index,
            behavior,
            visit_budget,
            max_steps,
            visits: vec![0; index.len()],
        }
    }

    /// Run one playthrough from `start`, drawing from `rng`.
    pub fn run(&mut self, start: usize, rng: &mut LcgRng) -> Traversal<'a> {
        let mut path = Vec::new();
        let mut chosen = Vec::new();
        let mut current = start;
        let mut outcome = RunOutcome::StepCap;

        for _ in 0..self.max_steps {
            path.push(current);
            self.visits[current] += 1;

            let edges = self.index.outgoing(current);
            if edges.is_empty() {
                outcome = RunOutcome::Completed;
                break;
            }

            let mut candidates: SmallVec<[&'a Choice; 8]> = SmallVec::new();
            let mut targets: SmallVec<[usize; 8]> = SmallVec::new();
            for edge in edges {
                if let Some(target) = edge.target
                    && self.visits[target] < self.visit_budget
                {
                    candidates.push(edge.choice);
                    targets.push(target);
                }
            }

            if candidates.is_empty() {
                outcome = RunOutcome::Stuck;
                break;
            }

            let picked = self.behavior.pick_index(&candidates, rng);
            chosen.push(candidates[picked]);
            current = targets[picked];
        }

        if outcome == RunOutcome::StepCap {
            log::trace!(
                "run from {} hit the {}-step cap",
                self.index.scene_id(start),
                self.max_steps
            );
        }

        for &idx in &path {
            self.visits[idx] = 0;
        }

        Traversal {
            path,
            choices: chosen,
            outcome,
        }
    }
}
