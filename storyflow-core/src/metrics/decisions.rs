//! Per-scene choice distributions and normalized decision entropy.

use serde::{Deserialize, Serialize};

use crate::analysis::scene_names;
use crate::data::{Choice, Scene};
use crate::graph::GraphIndex;
use crate::numbers::{ratio, usize_to_f64};
use crate::result::FlowResult;

const MIN_LABEL_FACTOR: f64 = 0.8;
const LABEL_LENGTH_SCALE: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceShare {
    pub choice_id: String,
    pub label: String,
    pub target_scene_id: Option<String>,
    pub selections: u32,
    /// Share of the scene's decisions, 0..=100.
    pub percentage: f64,
    pub appeal_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionDistribution {
    pub scene_id: String,
    pub scene_name: String,
    pub total_decisions: u32,
    pub choices: Vec<ChoiceShare>,
    /// Normalized Shannon entropy in `[0, 1]`; 1 is a perfectly even split.
    pub entropy: f64,
    pub dominant_choice_id: Option<String>,
}

/// Distributions for every scene with at least one outgoing choice, in scene order.
#[must_use]
pub fn decision_distributions(
    scenes: &[Scene],
    choices: &[Choice],
    result: &FlowResult,
) -> Vec<DecisionDistribution> {
    let index = GraphIndex::build(scenes, choices, None);
    let names = scene_names(scenes);

    (0..index.known_len())
        .filter(|&idx| !index.outgoing(idx).is_empty())
        .map(|idx| {
            let scene_id = index.scene_id(idx);
            let outgoing: Vec<&Choice> = index.outgoing(idx).iter().map(|e| e.choice).collect();
            distribution_for(
                scene_id,
                names.get(scene_id).copied().unwrap_or(scene_id),
                &outgoing,
                result,
            )
        })
        .collect()
}

fn distribution_for(
    scene_id: &str,
    scene_name: &str,
    outgoing: &[&Choice],
    result: &FlowResult,
) -> DecisionDistribution {
    let counts: Vec<u32> = outgoing
        .iter()
        .map(|choice| result.selections(&choice.id))
        .collect();
    let total: u32 = counts.iter().sum();

    let shares: Vec<ChoiceShare> = outgoing
        .iter()
        .zip(&counts)
        .map(|(choice, &selections)| {
            let rate = ratio(selections, total);
            ChoiceShare {
                choice_id: choice.id.clone(),
                label: choice.label.clone(),
                target_scene_id: choice.target_scene_id.clone(),
                selections,
                percentage: rate * 100.0,
                appeal_score: rate * label_factor(&choice.label),
            }
        })
        .collect();

    let dominant_choice_id = if total == 0 {
        None
    } else {
        // First maximum wins on ties.
        shares
            .iter()
            .fold(None::<&ChoiceShare>, |best, share| match best {
                Some(current) if current.selections >= share.selections => Some(current),
                _ => Some(share),
            })
            .map(|share| share.choice_id.clone())
    };

    DecisionDistribution {
        scene_id: scene_id.to_string(),
        scene_name: scene_name.to_string(),
        total_decisions: total,
        entropy: normalized_entropy(&counts),
        choices: shares,
        dominant_choice_id,
    }
}

/// Long labels lose appeal, down to a floor of 0.8.
fn label_factor(label: &str) -> f64 {
    let length = usize_to_f64(label.chars().count());
    (1.0 - length / LABEL_LENGTH_SCALE).max(MIN_LABEL_FACTOR)
}

/// `-Σ p·log2(p) / log2(n)`, or 0 with one choice or no decisions.
#[must_use]
pub fn normalized_entropy(counts: &[u32]) -> f64 {
    let total: u32 = counts.iter().sum();
    if counts.len() <= 1 || total == 0 {
        return 0.0;
    }
    let entropy: f64 = counts
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = ratio(count, total);
            -p * p.log2()
        })
        .sum();
    (entropy / usize_to_f64(counts.len()).log2()).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow_with(selections: &[(&str, u32)]) -> FlowResult {
        let mut result = FlowResult::default();
        for (id, count) in selections {
            result.choice_selections.insert((*id).to_string(), *count);
        }
        result
    }

    #[test]
    fn entropy_is_one_for_even_and_zero_for_deterministic() {
        assert!((normalized_entropy(&[50, 50]) - 1.0).abs() < 1e-12);
        assert!((normalized_entropy(&[10, 10, 10, 10]) - 1.0).abs() < 1e-12);
        assert!((normalized_entropy(&[100, 0]) - 0.0).abs() < 1e-12);
        assert!((normalized_entropy(&[7]) - 0.0).abs() < 1e-12);
        assert!((normalized_entropy(&[0, 0]) - 0.0).abs() < 1e-12);
        let skewed = normalized_entropy(&[90, 10]);
        assert!(skewed > 0.0 && skewed < 1.0);
    }

    #[test]
    fn distributions_cover_branching_scenes_only() {
        let scenes = vec![
            Scene::new("gate", "Gate"),
            Scene::new("yard", "Yard"),
            Scene::new("hall", "Hall"),
        ];
        let choices = vec![
            Choice::new("sneak", "gate", "Sneak", Some("yard")),
            Choice::new(
                "bluster",
                "gate",
                "Bluster loudly at the guards until somebody, anybody, opens the gate for you!",
                Some("hall"),
            ),
            Choice::new("rest", "yard", "Rest", None),
        ];
        let result = flow_with(&[("sneak", 30), ("bluster", 10), ("rest", 0)]);

        let found = decision_distributions(&scenes, &choices, &result);
        assert_eq!(found.len(), 2);
        let gate = &found[0];
        assert_eq!(gate.scene_id, "gate");
        assert_eq!(gate.total_decisions, 40);
        assert!((gate.choices[0].percentage - 75.0).abs() < 1e-9);
        assert!((gate.choices[0].appeal_score - 0.75 * 0.95).abs() < 1e-9);
        assert!((gate.choices[1].appeal_score - 0.25 * 0.8).abs() < 1e-9);
        assert_eq!(gate.dominant_choice_id.as_deref(), Some("sneak"));

        let yard = &found[1];
        assert_eq!(yard.total_decisions, 0);
        assert!((yard.entropy - 0.0).abs() < f64::EPSILON);
        assert!(yard.dominant_choice_id.is_none());
    }

    #[test]
    fn dominant_choice_prefers_first_on_ties() {
        let choices = [Choice::terminal("x", "s"), Choice::terminal("y", "s")];
        let refs: Vec<&Choice> = choices.iter().collect();
        let result = flow_with(&[("x", 4), ("y", 4)]);
        let dist = distribution_for("s", "S", &refs, &result);
        assert_eq!(dist.dominant_choice_id.as_deref(), Some("x"));
        assert!((dist.entropy - 1.0).abs() < 1e-12);
    }
}
