use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use storyflow_core::{GraphSource, StoryGraph};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Graph and config documents read from JSON files on disk.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    graph_path: PathBuf,
    start_override: Option<String>,
}

impl JsonFileSource {
    pub fn new(graph_path: impl Into<PathBuf>) -> Self {
        Self {
            graph_path: graph_path.into(),
            start_override: None,
        }
    }

    /// Replace the document's start scene when the graph is loaded.
    #[must_use]
    pub fn with_start(mut self, start: Option<String>) -> Self {
        self.start_override = start;
        self
    }

    fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, SourceError> {
        let raw = fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| SourceError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl GraphSource for JsonFileSource {
    type Error = SourceError;

    fn load_graph(&self) -> Result<StoryGraph, Self::Error> {
        let mut graph: StoryGraph = Self::read_json(&self.graph_path)?;
        if let Some(start) = &self.start_override {
            graph.start_scene_id = Some(start.clone());
        }
        log::debug!(
            "loaded {} scenes and {} choices from {}",
            graph.scenes.len(),
            graph.choices.len(),
            self.graph_path.display()
        );
        Ok(graph)
    }

    /// `config_name` is a path to a JSON document.
    fn load_config<T>(&self, config_name: &str) -> Result<T, Self::Error>
    where
        T: DeserializeOwned,
    {
        Self::read_json(Path::new(config_name))
    }
}
