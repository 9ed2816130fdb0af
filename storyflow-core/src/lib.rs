//! Storyflow Simulation Engine
//!
//! Monte Carlo flow simulation for branching narratives: simulated readers walk
//! a scene/choice graph under a configurable behavior model, and the resulting
//! counts feed critical-path, bottleneck, drop-off, coverage, entropy, heatmap
//! and path-length analytics. No storage or rendering lives here.

pub mod analysis;
pub mod behavior;
pub mod config;
pub mod data;
pub mod graph;
pub mod metrics;
pub mod numbers;
pub mod result;
pub mod seed;
pub mod simulation;
pub mod traversal;

// Re-export commonly used types
pub use behavior::BehaviorModel;
pub use config::{
    DEFAULT_MAX_STEPS, ExecutionMode, RevisitPolicy, SimulationConfig, SimulationError,
};
pub use data::{Choice, Scene, StoryGraph};
pub use graph::GraphIndex;
pub use metrics::{
    CoverageReport, DecisionDistribution, FlowReport, HeatBand, HeatmapData, PathStatistics,
    coverage_report, decision_distributions, heatmap, path_statistics,
};
pub use result::{
    Bottleneck, CriticalPath, DropOffPoint, FlowResult, GraphDiagnostics, PATH_KEY_SEPARATOR,
    PathTally,
};
pub use seed::LcgRng;
pub use simulation::{CancelToken, simulate, simulate_with_cancel};
pub use traversal::RunOutcome;

/// Trait for abstracting graph loading operations
/// Callers supply the storage-specific implementation
pub trait GraphSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the scene graph to simulate
    ///
    /// # Errors
    ///
    /// Returns an error if the graph cannot be loaded.
    fn load_graph(&self) -> Result<StoryGraph, Self::Error>;

    /// Load a named configuration document
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or parsed.
    fn load_config<T>(&self, config_name: &str) -> Result<T, Self::Error>
    where
        T: serde::de::DeserializeOwned;
}

/// Errors raised by [`FlowEngine`].
#[derive(Debug, thiserror::Error)]
pub enum EngineError<E: std::error::Error + 'static> {
    #[error("failed to load story graph")]
    Source(#[source] E),
    #[error(transparent)]
    Simulation(#[from] SimulationError),
}

/// Simulation front door over a [`GraphSource`]
pub struct FlowEngine<S>
where
    S: GraphSource,
{
    source: S,
}

impl<S> FlowEngine<S>
where
    S: GraphSource,
{
    pub const fn new(source: S) -> Self {
        Self { source }
    }

    /// Load a named configuration through the source
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot supply the configuration.
    pub fn load_config(&self, config_name: &str) -> Result<SimulationConfig, S::Error> {
        self.source.load_config(config_name)
    }

    /// Load the graph and simulate it from its own start scene
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or the configuration is invalid.
    pub fn run(&self, config: &SimulationConfig) -> Result<FlowReport, EngineError<S::Error>> {
        let graph = self.source.load_graph().map_err(EngineError::Source)?;
        Ok(graph.report(config)?)
    }
}

impl StoryGraph {
    /// Simulate from the document's start scene.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn simulate(&self, config: &SimulationConfig) -> Result<FlowResult, SimulationError> {
        simulate(
            &self.scenes,
            &self.choices,
            self.start_scene_id.as_deref(),
            config,
        )
    }

    /// Simulate and derive every report.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn report(&self, config: &SimulationConfig) -> Result<FlowReport, SimulationError> {
        let flow = self.simulate(config)?;
        Ok(FlowReport::build(&self.scenes, &self.choices, flow))
    }
}
