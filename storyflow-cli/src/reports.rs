use anyhow::Result;
use colored::Colorize;
use std::io::Write;

use storyflow_core::metrics::VisitClass;
use storyflow_core::{FlowReport, GraphDiagnostics, HeatBand};

const ARROW: &str = " → ";
const MAX_LISTED: usize = 10;

pub fn generate_console_report(
    out: &mut dyn Write,
    report: &FlowReport,
    verbose: bool,
) -> Result<()> {
    let flow = &report.flow;
    writeln!(out)?;
    writeln!(out, "{}", "📊 Flow Simulation Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "==========================".cyan())?;
    writeln!(
        out,
        "Start scene: {}",
        flow.start_scene_id.as_deref().unwrap_or("<none>")
    )?;
    writeln!(out, "Seed: {}", flow.seed)?;
    writeln!(
        out,
        "Iterations: {}/{}{}",
        flow.iterations_completed,
        flow.iterations,
        if flow.truncated {
            " (cancelled)".yellow().to_string()
        } else {
            String::new()
        }
    )?;
    writeln!(
        out,
        "Completion rate: {}",
        format!("{:.1}%", flow.completion_rate * 100.0).green()
    )?;
    writeln!(
        out,
        "Path length: avg {:.2}, median {}",
        flow.average_path_length, flow.median_path_length
    )?;
    writeln!(out)?;

    writeln!(out, "{}", "🧭 Critical Paths".bright_yellow().bold())?;
    writeln!(out, "{}", "-".repeat(30).yellow())?;
    if flow.critical_paths.is_empty() {
        writeln!(out, "No paths recorded.")?;
    }
    for (rank, path) in flow.critical_paths.iter().enumerate() {
        writeln!(
            out,
            "{:>2}. {} ({} runs, {:.1}%)",
            rank + 1,
            path.path.join(ARROW).bold(),
            path.frequency,
            path.percentage
        )?;
    }
    writeln!(out)?;

    writeln!(out, "{}", "🚧 Bottlenecks".bright_yellow().bold())?;
    writeln!(out, "{}", "-".repeat(30).yellow())?;
    if flow.bottlenecks.is_empty() {
        writeln!(out, "None above the 80% threshold.")?;
    }
    for bottleneck in &flow.bottlenecks {
        let marker = if bottleneck.required {
            "required".red()
        } else {
            "optional".normal()
        };
        writeln!(
            out,
            "• {} ({}) {:.1}% throughput, {}",
            bottleneck.scene_name.bold(),
            bottleneck.scene_id,
            bottleneck.throughput * 100.0,
            marker
        )?;
    }
    writeln!(out)?;

    writeln!(out, "{}", "📉 Drop-off Points".bright_yellow().bold())?;
    writeln!(out, "{}", "-".repeat(30).yellow())?;
    if flow.drop_off_points.is_empty() {
        writeln!(out, "No drop-off points flagged.")?;
    }
    for drop in &flow.drop_off_points {
        writeln!(
            out,
            "• {} ({}) exit rate {:.1}%, ~{} exits",
            drop.scene_name.bold(),
            drop.scene_id,
            drop.exit_rate * 100.0,
            drop.estimated_exits
        )?;
    }
    writeln!(out)?;

    let coverage = &report.coverage;
    writeln!(out, "{}", "🗺️  Coverage".bright_blue().bold())?;
    writeln!(out, "{}", "-".repeat(30).blue())?;
    writeln!(
        out,
        "Visited {}/{} reachable scenes ({:.1}%), {} total",
        coverage.visited_scenes,
        coverage.reachable_scenes,
        coverage.coverage_percentage,
        coverage.total_scenes
    )?;
    writeln!(out, "Max depth: {}", coverage.max_depth)?;
    for scene in &coverage.unreachable_scenes {
        writeln!(out, "   Unreachable: {}", scene.scene_id.red())?;
    }
    for scene_id in &coverage.never_visited {
        writeln!(out, "   Never visited: {}", scene_id.yellow())?;
    }
    for scene in &coverage.rarely_visited {
        writeln!(
            out,
            "   Rarely visited: {} ({} visits)",
            scene.scene_id.yellow(),
            scene.visits
        )?;
    }
    writeln!(out)?;

    writeln!(out, "{}", "🎲 Decisions".bright_blue().bold())?;
    writeln!(out, "{}", "-".repeat(30).blue())?;
    for dist in &report.decisions {
        writeln!(
            out,
            "{} entropy {:.2}, {} decisions, dominant {}",
            dist.scene_name.bold(),
            dist.entropy,
            dist.total_decisions,
            dist.dominant_choice_id.as_deref().unwrap_or("-")
        )?;
        if verbose {
            for share in &dist.choices {
                writeln!(
                    out,
                    "     • {} {:.1}% (appeal {:.2})",
                    share.label, share.percentage, share.appeal_score
                )?;
            }
        }
    }
    writeln!(out)?;

    writeln!(out, "{}", "🔥 Scene Heat".bright_magenta().bold())?;
    writeln!(out, "{}", "-".repeat(30).magenta())?;
    let mut hottest: Vec<_> = report.heatmap.scenes.iter().collect();
    hottest.sort_by(|a, b| b.visits.cmp(&a.visits));
    let limit = if verbose { hottest.len() } else { MAX_LISTED };
    for scene in hottest.into_iter().take(limit) {
        writeln!(
            out,
            "{:<24} {:>8} visits  {}",
            scene.scene_name,
            scene.visits,
            paint_band(scene.band)
        )?;
    }
    writeln!(out)?;

    let stats = &report.path_statistics;
    writeln!(out, "{}", "📏 Path Lengths".bright_magenta().bold())?;
    writeln!(out, "{}", "-".repeat(30).magenta())?;
    writeln!(
        out,
        "{} distinct paths, length {}..={}, std dev {:.2}",
        stats.distinct_paths, stats.min_length, stats.max_length, stats.std_dev
    )?;

    if !flow.diagnostics.is_clean() {
        writeln!(out)?;
        writeln!(out, "{}", "⚠️  Graph Diagnostics".yellow().bold())?;
        for line in diagnostic_lines(&flow.diagnostics) {
            writeln!(out, "   {}", line.yellow())?;
        }
    }
    Ok(())
}

pub fn generate_json_report(out: &mut dyn Write, report: &FlowReport) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)?;
    Ok(())
}

pub fn generate_markdown_report(out: &mut dyn Write, report: &FlowReport) -> Result<()> {
    let flow = &report.flow;
    writeln!(out, "# Story Flow Report\n")?;

    writeln!(out, "## Summary\n")?;
    writeln!(
        out,
        "- **Start scene**: {}",
        flow.start_scene_id.as_deref().unwrap_or("none")
    )?;
    writeln!(out, "- **Seed**: {}", flow.seed)?;
    writeln!(
        out,
        "- **Iterations**: {}/{}",
        flow.iterations_completed, flow.iterations
    )?;
    writeln!(
        out,
        "- **Completion rate**: {:.1}%",
        flow.completion_rate * 100.0
    )?;
    writeln!(
        out,
        "- **Average path length**: {:.2}",
        flow.average_path_length
    )?;
    writeln!(out, "- **Median path length**: {}", flow.median_path_length)?;
    writeln!(
        out,
        "- **Coverage**: {:.1}% of reachable scenes\n",
        report.coverage.coverage_percentage
    )?;

    writeln!(out, "## Critical Paths\n")?;
    writeln!(out, "| Rank | Path | Runs | Share |")?;
    writeln!(out, "|---:|---|---:|---:|")?;
    for (rank, path) in flow.critical_paths.iter().enumerate() {
        writeln!(
            out,
            "| {} | {} | {} | {:.1}% |",
            rank + 1,
            path.path.join(ARROW),
            path.frequency,
            path.percentage
        )?;
    }
    writeln!(out)?;

    if !flow.bottlenecks.is_empty() {
        writeln!(out, "## Bottlenecks\n")?;
        for bottleneck in &flow.bottlenecks {
            writeln!(
                out,
                "- **{}** ({:.1}% throughput{})",
                bottleneck.scene_name,
                bottleneck.throughput * 100.0,
                if bottleneck.required { ", required" } else { "" }
            )?;
        }
        writeln!(out)?;
    }

    if !flow.drop_off_points.is_empty() {
        writeln!(out, "## Drop-off Points\n")?;
        for drop in &flow.drop_off_points {
            writeln!(
                out,
                "- **{}**: exit rate {:.1}%, ~{} exits",
                drop.scene_name,
                drop.exit_rate * 100.0,
                drop.estimated_exits
            )?;
        }
        writeln!(out)?;
    }

    writeln!(out, "## Scenes\n")?;
    writeln!(out, "| Scene | Visits | Heat | Class |")?;
    writeln!(out, "|---|---:|---|---|")?;
    for scene in &report.heatmap.scenes {
        let class = report
            .coverage
            .classes
            .get(&scene.scene_id)
            .map_or("-", |class| class_label(*class));
        writeln!(
            out,
            "| {} | {} | {} | {} |",
            scene.scene_name,
            scene.visits,
            scene.band.label(),
            class
        )?;
    }
    writeln!(out)?;

    writeln!(out, "## Decisions\n")?;
    for dist in &report.decisions {
        writeln!(
            out,
            "### {} (entropy {:.2})\n",
            dist.scene_name, dist.entropy
        )?;
        for share in &dist.choices {
            writeln!(
                out,
                "- {}: {} ({:.1}%)",
                share.label, share.selections, share.percentage
            )?;
        }
        writeln!(out)?;
    }

    if !flow.diagnostics.is_clean() {
        writeln!(out, "## Diagnostics\n")?;
        for line in diagnostic_lines(&flow.diagnostics) {
            writeln!(out, "- {line}")?;
        }
    }
    Ok(())
}

fn paint_band(band: HeatBand) -> colored::ColoredString {
    match band {
        HeatBand::Cold => band.label().blue(),
        HeatBand::Cool => band.label().cyan(),
        HeatBand::Warm => band.label().yellow(),
        HeatBand::Hot => band.label().red(),
    }
}

const fn class_label(class: VisitClass) -> &'static str {
    match class {
        VisitClass::Orphaned => "orphaned",
        VisitClass::NeverVisited => "never visited",
        VisitClass::RarelyVisited => "rarely visited",
        VisitClass::Normal => "normal",
    }
}

fn diagnostic_lines(diagnostics: &GraphDiagnostics) -> Vec<String> {
    let mut lines: Vec<String> = diagnostics
        .dangling_targets
        .iter()
        .map(|d| {
            format!(
                "choice {} targets unknown scene {}",
                d.choice_id, d.target_scene_id
            )
        })
        .collect();
    lines.extend(
        diagnostics
            .unknown_sources
            .iter()
            .map(|id| format!("choices leave undeclared scene {id}")),
    );
    if diagnostics.unknown_start {
        lines.push("start scene is not declared".to_string());
    }
    lines
}
