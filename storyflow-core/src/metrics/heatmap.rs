//! Min-max normalized visit and selection heat.

use serde::{Deserialize, Serialize};

use crate::data::{Choice, Scene};
use crate::result::FlowResult;

/// Four-band heat category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeatBand {
    Cold,
    Cool,
    Warm,
    Hot,
}

impl HeatBand {
    /// Band for a normalized heat, split at 0.25 / 0.5 / 0.75.
    #[must_use]
    pub fn from_heat(heat: f64) -> Self {
        if heat < 0.25 {
            Self::Cold
        } else if heat < 0.5 {
            Self::Cool
        } else if heat < 0.75 {
            Self::Warm
        } else {
            Self::Hot
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cold => "cold",
            Self::Cool => "cool",
            Self::Warm => "warm",
            Self::Hot => "hot",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneHeat {
    pub scene_id: String,
    pub scene_name: String,
    pub visits: u32,
    pub heat: f64,
    pub band: HeatBand,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceHeat {
    pub choice_id: String,
    pub source_scene_id: String,
    pub target_scene_id: Option<String>,
    pub selections: u32,
    pub heat: f64,
    pub band: HeatBand,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapData {
    pub scenes: Vec<SceneHeat>,
    pub choices: Vec<ChoiceHeat>,
    pub max_scene_visits: u32,
    pub max_choice_selections: u32,
}

#[must_use]
pub fn heatmap(scenes: &[Scene], choices: &[Choice], result: &FlowResult) -> HeatmapData {
    let visits: Vec<u32> = scenes.iter().map(|scene| result.visits(&scene.id)).collect();
    let selections: Vec<u32> = choices
        .iter()
        .map(|choice| result.selections(&choice.id))
        .collect();

    let scene_heat = normalize(&visits)
        .into_iter()
        .zip(scenes.iter().zip(&visits))
        .map(|(heat, (scene, &visits))| SceneHeat {
            scene_id: scene.id.clone(),
            scene_name: scene.name.clone(),
            visits,
            heat,
            band: HeatBand::from_heat(heat),
        })
        .collect();

    let choice_heat = normalize(&selections)
        .into_iter()
        .zip(choices.iter().zip(&selections))
        .map(|(heat, (choice, &selections))| ChoiceHeat {
            choice_id: choice.id.clone(),
            source_scene_id: choice.source_scene_id.clone(),
            target_scene_id: choice.target_scene_id.clone(),
            selections,
            heat,
            band: HeatBand::from_heat(heat),
        })
        .collect();

    HeatmapData {
        scenes: scene_heat,
        choices: choice_heat,
        max_scene_visits: visits.iter().copied().max().unwrap_or(0),
        max_choice_selections: selections.iter().copied().max().unwrap_or(0),
    }
}

/// Min-max over nonzero counts; zero counts stay at 0, a flat range maps to 1.
fn normalize(counts: &[u32]) -> Vec<f64> {
    let nonzero = counts.iter().copied().filter(|&count| count > 0);
    let (Some(min), Some(max)) = (nonzero.clone().min(), nonzero.max()) else {
        return vec![0.0; counts.len()];
    };
    counts
        .iter()
        .map(|&count| {
            if count == 0 {
                0.0
            } else if max == min {
                1.0
            } else {
                f64::from(count - min) / f64::from(max - min)
            }
        })
        .collect()
}
