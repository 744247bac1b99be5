//! Concentration measures over count distributions

use serde::{Deserialize, Serialize};

/// Gini coefficient of `counts`: 0 when crime is spread evenly, approaching
/// 1 when it is concentrated in a single unit. Empty or all-zero input is 0.
pub fn gini(counts: &[u64]) -> f64 {
    let n = counts.len();
    let total: u64 = counts.iter().sum();
    if n == 0 || total == 0 {
        return 0.0;
    }
    let mut sorted = counts.to_vec();
    sorted.sort_unstable();
    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, &c)| (i as f64 + 1.0) * c as f64)
        .sum();
    let n = n as f64;
    (2.0 * weighted) / (n * total as f64) - (n + 1.0) / n
}

/// Fraction of units, busiest first, needed to hold `pct` percent of all
/// crime. Lower means more concentrated. Empty or all-zero input is 0.
pub fn lorenz_share(counts: &[u64], pct: f64) -> f64 {
    let total: u64 = counts.iter().sum();
    if total == 0 || pct <= 0.0 {
        return 0.0;
    }
    let target = total as f64 * pct.min(100.0) / 100.0;
    let mut sorted = counts.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));

    let mut running = 0u64;
    let mut needed = sorted.len();
    for (i, &count) in sorted.iter().enumerate() {
        running += count;
        if running as f64 >= target {
            needed = i + 1;
            break;
        }
    }
    needed as f64 / sorted.len() as f64
}

/// Lorenz shares at 10, 20 and 50 percent of crime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LorenzShares {
    pub l_10: f64,
    pub l_20: f64,
    pub l_50: f64,
}

impl LorenzShares {
    pub fn from_counts(counts: &[u64]) -> Self {
        Self {
            l_10: lorenz_share(counts, 10.0),
            l_20: lorenz_share(counts, 20.0),
            l_50: lorenz_share(counts, 50.0),
        }
    }
}

/// `part` as a percentage of `total`; 0 when `total` is 0.
pub fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * part as f64 / total as f64
    }
}
