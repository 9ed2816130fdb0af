//! Adjacency index over the flat scene/choice lists.
//!
//! Scene ids are interned to dense indices: known scenes first in input order,
//! then any id that only appears as the start or as a choice source. Choice
//! targets naming no known scene resolve to `None`, exactly like null targets.

use std::collections::{HashMap, VecDeque};

use crate::data::{Choice, Scene};
use crate::result::{DanglingTarget, GraphDiagnostics};

/// Outgoing edge of an indexed scene.
#[derive(Debug, Clone, Copy)]
pub struct Edge<'a> {
    pub choice: &'a Choice,
    pub target: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct GraphIndex<'a> {
    ids: Vec<&'a str>,
    lookup: HashMap<&'a str, usize>,
    known: usize,
    outgoing: Vec<Vec<Edge<'a>>>,
    start: Option<usize>,
    diagnostics: GraphDiagnostics,
}

impl<'a> GraphIndex<'a> {
    #[must_use]
    pub fn build(scenes: &'a [Scene], choices: &'a [Choice], start: Option<&'a str>) -> Self {
        let mut index = Self {
            ids: Vec::with_capacity(scenes.len()),
            lookup: HashMap::with_capacity(scenes.len()),
            known: 0,
            outgoing: Vec::with_capacity(scenes.len()),
            start: None,
            diagnostics: GraphDiagnostics::default(),
        };

        for scene in scenes {
            index.intern(&scene.id);
        }
        index.known = index.ids.len();

        if let Some(start_id) = start {
            index.diagnostics.unknown_start = !index.lookup.contains_key(start_id);
            index.start = Some(index.intern(start_id));
        }

        for choice in choices {
            if !index.lookup.contains_key(choice.source_scene_id.as_str()) {
                index
                    .diagnostics
                    .unknown_sources
                    .push(choice.id.clone());
            }
            let source = index.intern(&choice.source_scene_id);
            let target = choice
                .target_scene_id
                .as_deref()
                .and_then(|target_id| index.resolve_target(choice, target_id));
            index.outgoing[source].push(Edge { choice, target });
        }

        index
    }

    fn intern(&mut self, id: &'a str) -> usize {
        if let Some(&idx) = self.lookup.get(id) {
            return idx;
        }
        let idx = self.ids.len();
        self.ids.push(id);
        self.lookup.insert(id, idx);
        self.outgoing.push(Vec::new());
        idx
    }

    fn resolve_target(&mut self, choice: &Choice, target_id: &str) -> Option<usize> {
        match self.lookup.get(target_id) {
            Some(&idx) if idx < self.known => Some(idx),
            _ => {
                self.diagnostics.dangling_targets.push(DanglingTarget {
                    choice_id: choice.id.clone(),
                    target_scene_id: target_id.to_string(),
                });
                None
            }
        }
    }

    /// Number of interned ids, including ids absent from the scene list.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of ids that belong to real scenes.
    #[must_use]
    pub const fn known_len(&self) -> usize {
        self.known
    }

    #[must_use]
    pub fn scene_id(&self, idx: usize) -> &'a str {
        self.ids[idx]
    }

    #[must_use]
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.lookup.get(id).copied()
    }

    #[must_use]
    pub const fn start(&self) -> Option<usize> {
        self.start
    }

    #[must_use]
    pub fn outgoing(&self, idx: usize) -> &[Edge<'a>] {
        self.outgoing.get(idx).map_or(&[], Vec::as_slice)
    }

    /// Outgoing choices of a scene by id, in input order.
    pub fn choices_from(&self, id: &str) -> impl Iterator<Item = &'a Choice> + '_ {
        self.index_of(id)
            .into_iter()
            .flat_map(|idx| self.outgoing(idx).iter().map(|edge| edge.choice))
    }

    #[must_use]
    pub const fn diagnostics(&self) -> &GraphDiagnostics {
        &self.diagnostics
    }

    /// Breadth-first depth of every interned id from `start`; `None` when unreachable.
    #[must_use]
    pub fn depths_from(&self, start: usize) -> Vec<Option<usize>> {
        let mut depths = vec![None; self.ids.len()];
        let Some(slot) = depths.get_mut(start) else {
            return depths;
        };
        *slot = Some(0);

        let mut queue = VecDeque::from([(start, 0_usize)]);
        while let Some((current, depth)) = queue.pop_front() {
            for target in self.outgoing(current).iter().filter_map(|edge| edge.target) {
                if depths[target].is_none() {
                    depths[target] = Some(depth + 1);
                    queue.push_back((target, depth + 1));
                }
            }
        }
        depths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenes(ids: &[&str]) -> Vec<Scene> {
        ids.iter().map(|id| Scene::new(*id, id.to_uppercase())).collect()
    }

    #[test]
    fn groups_choices_by_source_in_input_order() {
        let scenes = scenes(&["a", "b", "c"]);
        let choices = vec![
            Choice::to("a-c", "a", "c"),
            Choice::to("b-c", "b", "c"),
            Choice::to("a-b", "a", "b"),
        ];
        let index = GraphIndex::build(&scenes, &choices, Some("a"));
        let from_a: Vec<&str> = index.choices_from("a").map(|c| c.id.as_str()).collect();
        assert_eq!(from_a, ["a-c", "a-b"]);
        assert_eq!(index.choices_from("c").count(), 0);
        assert!(index.diagnostics().is_clean());
    }

    #[test]
    fn dangling_targets_resolve_to_none_and_are_reported() {
        let scenes = scenes(&["a"]);
        let choices = vec![
            Choice::to("lost", "a", "nowhere"),
            Choice::terminal("quit", "a"),
        ];
        let index = GraphIndex::build(&scenes, &choices, Some("a"));
        let start = index.start().unwrap();
        assert!(index.outgoing(start).iter().all(|edge| edge.target.is_none()));
        assert_eq!(index.diagnostics().dangling_targets.len(), 1);
        assert_eq!(index.diagnostics().dangling_targets[0].choice_id, "lost");
    }

    #[test]
    fn unknown_start_and_sources_are_interned_but_flagged() {
        let scenes = scenes(&["a"]);
        let choices = vec![Choice::to("ghost-a", "ghost", "a")];
        let index = GraphIndex::build(&scenes, &choices, Some("prologue"));
        assert!(index.diagnostics().unknown_start);
        assert_eq!(index.diagnostics().unknown_sources, ["ghost-a"]);
        assert_eq!(index.known_len(), 1);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn depths_follow_shortest_hops() {
        let scenes = scenes(&["a", "b", "c", "d", "island"]);
        let choices = vec![
            Choice::to("a-b", "a", "b"),
            Choice::to("b-c", "b", "c"),
            Choice::to("a-c", "a", "c"),
            Choice::to("c-d", "c", "d"),
            Choice::to("d-a", "d", "a"),
        ];
        let index = GraphIndex::build(&scenes, &choices, Some("a"));
        let depths = index.depths_from(index.start().unwrap());
        assert_eq!(depths, [Some(0), Some(1), Some(1), Some(2), None]);
    }
}
