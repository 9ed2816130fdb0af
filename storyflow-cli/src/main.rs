mod reports;
mod source;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use source::JsonFileSource;
use storyflow_core::{
    BehaviorModel, ExecutionMode, FlowEngine, FlowReport, RevisitPolicy, SimulationConfig,
};

const DEFAULT_ITERATIONS: u32 = 1_000;
const DEFAULT_EXPLORATION_FACTOR: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BehaviorKind {
    /// Every available choice is equally likely
    Uniform,
    /// Choices drawn in proportion to `--weight` values (default 1.0)
    Weighted,
    /// Later choices favored as the exploration factor approaches 1
    Exploration,
    /// Always the first available choice
    Optimal,
}

#[derive(Debug, Parser)]
#[command(name = "storyflow", version)]
#[command(about = "Monte Carlo reader-flow simulation for branching narratives")]
struct Args {
    /// Story graph document (JSON with scenes, choices and start_scene_id)
    #[arg(long)]
    graph: PathBuf,

    /// Simulation config document (JSON); flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of simulated playthroughs
    #[arg(long)]
    iterations: Option<u32>,

    /// Reader behavior model
    #[arg(long, value_enum)]
    behavior: Option<BehaviorKind>,

    /// Exploration factor in [0, 1] (exploration behavior only)
    #[arg(long)]
    exploration_factor: Option<f64>,

    /// Choice weight as CHOICE_ID=WEIGHT (repeatable, weighted behavior only)
    #[arg(long = "weight", value_parser = parse_weight)]
    weights: Vec<(String, f64)>,

    /// Seed for reproducible runs; time-derived when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Split iterations across this many worker threads
    #[arg(long)]
    workers: Option<u32>,

    /// Allow each scene to be entered up to N times per run
    #[arg(long)]
    visit_budget: Option<u32>,

    /// Per-run step cap
    #[arg(long)]
    max_steps: Option<u32>,

    /// Override the document's start scene
    #[arg(long)]
    start: Option<String>,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.report == "console" {
        announce_banner();
    }

    let start_time = Instant::now();
    let engine = FlowEngine::new(JsonFileSource::new(&args.graph).with_start(args.start.clone()));
    let config = resolve_config(&args, &engine)?;
    log::info!(
        "simulating {} iterations with {} behavior",
        config.iterations,
        config.behavior
    );

    let report = engine
        .run(&config)
        .with_context(|| format!("simulation of {} failed", args.graph.display()))?;

    write_report(&args, &report, start_time)
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn announce_banner() {
    println!("{}", "📖 Storyflow Simulator".bright_cyan().bold());
    println!("{}", "======================".cyan());
}

fn parse_weight(raw: &str) -> Result<(String, f64), String> {
    let (choice_id, weight) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected CHOICE_ID=WEIGHT, got {raw}"))?;
    let weight: f64 = weight
        .trim()
        .parse()
        .map_err(|_| format!("invalid weight {weight:?} for {choice_id}"))?;
    Ok((choice_id.trim().to_string(), weight))
}

/// File config (when given) overlaid with command-line flags.
fn resolve_config(args: &Args, engine: &FlowEngine<JsonFileSource>) -> Result<SimulationConfig> {
    let mut config = match &args.config {
        Some(path) => engine
            .load_config(&path.to_string_lossy())
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => SimulationConfig::new(DEFAULT_ITERATIONS, BehaviorModel::Uniform),
    };

    if let Some(iterations) = args.iterations {
        config.iterations = iterations;
    }
    config.behavior = resolve_behavior(config.behavior, args)?;
    if let Some(seed) = args.seed {
        config.random_seed = Some(seed);
    }
    if let Some(max_visits_per_scene) = args.visit_budget {
        config.revisit = RevisitPolicy::VisitBudget {
            max_visits_per_scene,
        };
    }
    if let Some(max_steps) = args.max_steps {
        config.max_steps = max_steps;
    }
    if let Some(workers) = args.workers {
        config.execution = ExecutionMode::Parallel { workers };
    }

    config.validate().context("invalid simulation config")?;
    Ok(config)
}

fn resolve_behavior(current: BehaviorModel, args: &Args) -> Result<BehaviorModel> {
    let kind = args.behavior.unwrap_or(match current {
        BehaviorModel::Uniform => BehaviorKind::Uniform,
        BehaviorModel::Weighted { .. } => BehaviorKind::Weighted,
        BehaviorModel::Exploration { .. } => BehaviorKind::Exploration,
        BehaviorModel::Optimal => BehaviorKind::Optimal,
    });

    if args.exploration_factor.is_some() && kind != BehaviorKind::Exploration {
        bail!("--exploration-factor requires the exploration behavior");
    }
    if !args.weights.is_empty() && kind != BehaviorKind::Weighted {
        bail!("--weight requires the weighted behavior");
    }

    Ok(match kind {
        BehaviorKind::Uniform => BehaviorModel::Uniform,
        BehaviorKind::Optimal => BehaviorModel::Optimal,
        BehaviorKind::Exploration => {
            let inherited = match current {
                BehaviorModel::Exploration { factor } => factor,
                _ => DEFAULT_EXPLORATION_FACTOR,
            };
            BehaviorModel::Exploration {
                factor: args.exploration_factor.unwrap_or(inherited),
            }
        }
        BehaviorKind::Weighted => {
            let mut weights = match current {
                BehaviorModel::Weighted { weights } => weights,
                _ => BTreeMap::new(),
            };
            weights.extend(args.weights.iter().cloned());
            BehaviorModel::Weighted { weights }
        }
    })
}

fn write_report(args: &Args, report: &FlowReport, start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => reports::generate_json_report(&mut output_target, report)?,
        "markdown" => reports::generate_markdown_report(&mut output_target, report)?,
        _ => {
            reports::generate_console_report(&mut output_target, report, args.verbose)?;
            writeln!(&mut output_target)?;
            writeln!(
                &mut output_target,
                "🏁 Total time: {:?}",
                start_time.elapsed()
            )?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("fixtures")
            .join(name)
    }

    fn base_args() -> Args {
        Args {
            graph: fixture("heist.json"),
            config: None,
            iterations: Some(200),
            behavior: None,
            exploration_factor: None,
            weights: Vec::new(),
            seed: Some(42),
            workers: None,
            visit_budget: None,
            max_steps: None,
            start: None,
            report: "json".to_string(),
            verbose: false,
            output: None,
        }
    }

    fn engine(args: &Args) -> FlowEngine<JsonFileSource> {
        FlowEngine::new(JsonFileSource::new(&args.graph).with_start(args.start.clone()))
    }

    #[test]
    fn parse_weight_accepts_pairs_and_rejects_garbage() {
        assert_eq!(parse_weight("bribe=2.5"), Ok(("bribe".to_string(), 2.5)));
        assert_eq!(parse_weight(" run = 1 "), Ok(("run".to_string(), 1.0)));
        assert!(parse_weight("bribe").is_err());
        assert!(parse_weight("bribe=lots").is_err());
    }

    #[test]
    fn defaults_apply_without_config_file() {
        let args = Args {
            iterations: None,
            seed: None,
            ..base_args()
        };
        let config = resolve_config(&args, &engine(&args)).unwrap();
        assert_eq!(config.iterations, DEFAULT_ITERATIONS);
        assert_eq!(config.behavior, BehaviorModel::Uniform);
        assert!(config.random_seed.is_none());
    }

    #[test]
    fn flags_override_config_file() {
        let args = Args {
            config: Some(fixture("explore.json")),
            iterations: Some(50),
            exploration_factor: Some(0.9),
            seed: None,
            workers: Some(2),
            visit_budget: Some(3),
            ..base_args()
        };
        let config = resolve_config(&args, &engine(&args)).unwrap();
        assert_eq!(config.iterations, 50);
        assert_eq!(config.random_seed, Some(42));
        assert_eq!(config.behavior, BehaviorModel::Exploration { factor: 0.9 });
        assert_eq!(config.execution, ExecutionMode::Parallel { workers: 2 });
        assert_eq!(config.revisit.budget(), 3);
    }

    #[test]
    fn config_file_behavior_is_inherited() {
        let args = Args {
            config: Some(fixture("explore.json")),
            iterations: None,
            ..base_args()
        };
        let config = resolve_config(&args, &engine(&args)).unwrap();
        assert_eq!(config.iterations, 2_000);
        assert_eq!(config.behavior, BehaviorModel::Exploration { factor: 0.3 });
    }

    #[test]
    fn weights_require_weighted_behavior() {
        let mut args = base_args();
        args.weights = vec![("bribe".to_string(), 3.0)];
        assert!(resolve_config(&args, &engine(&args)).is_err());

        args.behavior = Some(BehaviorKind::Weighted);
        let config = resolve_config(&args, &engine(&args)).unwrap();
        assert_eq!(
            config.behavior,
            BehaviorModel::Weighted {
                weights: BTreeMap::from([("bribe".to_string(), 3.0)]),
            }
        );
    }

    #[test]
    fn invalid_values_are_rejected_before_running() {
        let args = Args {
            behavior: Some(BehaviorKind::Exploration),
            exploration_factor: Some(1.5),
            ..base_args()
        };
        let err = resolve_config(&args, &engine(&args)).unwrap_err();
        assert!(format!("{err:#}").contains("exploration factor"));

        let args = Args {
            iterations: Some(0),
            ..base_args()
        };
        assert!(resolve_config(&args, &engine(&args)).is_err());
    }

    #[test]
    fn write_report_emits_json_output() {
        let temp = std::env::temp_dir().join("storyflow-test-report.json");
        let args = Args {
            output: Some(temp.clone()),
            ..base_args()
        };
        let config = resolve_config(&args, &engine(&args)).unwrap();
        let report = engine(&args).run(&config).unwrap();
        write_report(&args, &report, Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        let parsed: FlowReport = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.flow.iterations, 200);
        assert_eq!(parsed.flow.visits("briefing"), 200);
        assert_eq!(parsed.flow.visits("rooftop"), 0);
    }

    #[test]
    fn write_report_emits_markdown_and_console() {
        let md = std::env::temp_dir().join("storyflow-test-report.md");
        let args = Args {
            report: "markdown".to_string(),
            output: Some(md.clone()),
            ..base_args()
        };
        let config = resolve_config(&args, &engine(&args)).unwrap();
        let report = engine(&args).run(&config).unwrap();
        write_report(&args, &report, Instant::now()).unwrap();
        assert!(std::fs::read_to_string(md).unwrap().contains("# Story Flow Report"));

        let console = std::env::temp_dir().join("storyflow-test-report.txt");
        let args = Args {
            report: "console".to_string(),
            output: Some(console.clone()),
            ..args
        };
        write_report(&args, &report, Instant::now()).unwrap();
        let content = std::fs::read_to_string(console).unwrap();
        assert!(content.contains("Flow Simulation Summary"));
        assert_eq!(content.matches("Total time").count(), 1);
    }

    #[test]
    fn exploration_help_describes_later_bias() {
        let value = BehaviorKind::Exploration.to_possible_value().unwrap();
        let help = value.get_help().map(ToString::to_string).unwrap_or_default();
        assert!(help.contains("Later choices favored"));
    }

    #[test]
    fn output_target_stdout_writes() {
        let mut target = OutputTarget::new(None).unwrap();
        target.write_all(b"ok").unwrap();
        target.flush().unwrap();
    }
}
