use serde::{Deserialize, Serialize};

/// A node in the narrative graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl Scene {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A directed, labeled edge from one scene to another (or to nowhere).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub id: String,
    pub source_scene_id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub target_scene_id: Option<String>,
}

impl Choice {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        source_scene_id: impl Into<String>,
        label: impl Into<String>,
        target_scene_id: Option<&str>,
    ) -> Self {
        Self {
            id: id.into(),
            source_scene_id: source_scene_id.into(),
            label: label.into(),
            target_scene_id: target_scene_id.map(str::to_string),
        }
    }

    /// Choice leading to `target`.
    #[must_use]
    pub fn to(id: &str, source: &str, target: &str) -> Self {
        Self::new(id, source, id, Some(target))
    }

    /// Choice with no onward scene.
    #[must_use]
    pub fn terminal(id: &str, source: &str) -> Self {
        Self::new(id, source, id, None)
    }
}

/// Caller-supplied scene graph in document form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StoryGraph {
    #[serde(default)]
    pub scenes: Vec<Scene>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub start_scene_id: Option<String>,
}

impl StoryGraph {
    #[must_use]
    pub fn new(scenes: Vec<Scene>, choices: Vec<Choice>, start_scene_id: Option<&str>) -> Self {
        Self {
            scenes,
            choices,
            start_scene_id: start_scene_id.map(str::to_string),
        }
    }

    /// Load a graph document from a JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a graph document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn scene(&self, id: &str) -> Option<&Scene> {
        self.scenes.iter().find(|scene| scene.id == id)
    }
}
