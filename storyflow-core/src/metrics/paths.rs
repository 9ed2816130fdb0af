use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::numbers::usize_to_f64;
use crate::result::FlowResult;

/// Frequency-weighted path-length statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PathStatistics {
    pub total_paths: u32,
    pub distinct_paths: usize,
    pub min_length: usize,
    pub max_length: usize,
    pub mean_length: f64,
    pub median_length: usize,
    pub std_dev: f64,
    /// Runs per path length.
    pub length_distribution: BTreeMap<usize, u32>,
}

#[must_use]
pub fn path_statistics(result: &FlowResult) -> PathStatistics {
    let mut histogram: BTreeMap<usize, u32> = BTreeMap::new();
    for tally in result.path_frequencies.values() {
        *histogram.entry(tally.scenes.len()).or_default() += tally.count;
    }

    let total: u32 = histogram.values().sum();
    if total == 0 {
        return PathStatistics {
            distinct_paths: result.path_frequencies.len(),
            ..PathStatistics::default()
        };
    }

    let weighted_sum: f64 = histogram
        .iter()
        .map(|(&length, &count)| usize_to_f64(length) * f64::from(count))
        .sum();
    let mean = weighted_sum / f64::from(total);
    let variance = histogram
        .iter()
        .map(|(&length, &count)| {
            let delta = usize_to_f64(length) - mean;
            delta * delta * f64::from(count)
        })
        .sum::<f64>()
        / f64::from(total);

    // Element n/2 of the expanded, sorted length list.
    let middle = total / 2;
    let mut cumulative = 0;
    let mut median = 0;
    for (&length, &count) in &histogram {
        cumulative += count;
        if cumulative > middle {
            median = length;
            break;
        }
    }

    PathStatistics {
        total_paths: total,
        distinct_paths: result.path_frequencies.len(),
        min_length: histogram.keys().next().copied().unwrap_or(0),
        max_length: histogram.keys().next_back().copied().unwrap_or(0),
        mean_length: mean,
        median_length: median,
        std_dev: variance.sqrt(),
        length_distribution: histogram,
    }
}
