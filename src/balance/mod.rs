//! Monte-Carlo selection balance.
//!
//! Replays the controller's selection rule (guarantees first, then weighted
//! draw) over many independent trials and compares observed pick shares with
//! the configured weights. Trials run in parallel with rayon. Each trial seeds
//! its own Xoshiro RNG from a SHA3 hash of `base_seed` and the trial index and
//! works on its own clone of the table, so a report is reproducible.

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use tracing::{info, info_span};

use crate::controller::SelectionTable;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionSimConfig {
    pub trials: u64,
    pub picks_per_trial: u32,
    pub base_seed: u64,
}

impl Default for SelectionSimConfig {
    fn default() -> Self {
        Self {
            trials: 1_000,
            picks_per_trial: 100,
            base_seed: 42,
        }
    }
}

/// Per-entry outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryBalance {
    pub name: String,
    pub weight: f32,
    pub guarantee_interval: u32,
    /// weight / total weight
    pub expected_share: f32,
    pub observed_share: f32,
    pub picks: u64,
    /// Longest run of picks without this entry, over all trials
    pub max_gap: u32,
}

/// How far observed shares stray from weights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceGrade {
    Excellent, // deviation < 0.01
    Good,      // deviation < 0.03
    Fair,      // deviation < 0.08
    Skewed,    // guarantees or tiny sample dominate
}

impl BalanceGrade {
    fn from_deviation(deviation: f32) -> Self {
        if deviation < 0.01 {
            Self::Excellent
        } else if deviation < 0.03 {
            Self::Good
        } else if deviation < 0.08 {
            Self::Fair
        } else {
            Self::Skewed
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionReport {
    pub trials: u64,
    pub total_picks: u64,
    /// Draws that produced no attack (empty or zero-weight table)
    pub empty_picks: u64,
    pub entries: Vec<EntryBalance>,
    pub max_share_deviation: f32,
    pub grade: BalanceGrade,
}

impl SelectionReport {
    pub fn entry(&self, name: &str) -> Option<&EntryBalance> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

struct TrialOutcome {
    counts: Vec<u64>,
    max_gaps: Vec<u32>,
    empty: u64,
}

/// SHA3 of (base seed, trial index), first 8 bytes
fn trial_seed(base_seed: u64, trial: u64) -> u64 {
    let mut hasher = Sha3_256::new();
    hasher.update(base_seed.to_le_bytes());
    hasher.update(trial.to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

fn run_trial(table: &SelectionTable, picks: u32, seed: u64) -> TrialOutcome {
    let mut table = table.clone();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let n = table.len();
    let mut counts = vec![0u64; n];
    let mut gaps = vec![0u32; n];
    let mut max_gaps = vec![0u32; n];
    let mut empty = 0;

    for _ in 0..picks {
        let chosen = table.next(&mut rng);
        if chosen.is_none() {
            empty += 1;
        }
        for i in 0..n {
            if Some(i) == chosen {
                counts[i] += 1;
                max_gaps[i] = max_gaps[i].max(gaps[i]);
                gaps[i] = 0;
            } else {
                gaps[i] += 1;
            }
        }
    }
    for i in 0..n {
        max_gaps[i] = max_gaps[i].max(gaps[i]);
    }
    TrialOutcome {
        counts,
        max_gaps,
        empty,
    }
}

/// Run `config.trials` independent selection sequences in parallel
pub fn run_selection_simulation(table: &SelectionTable, config: &SelectionSimConfig) -> SelectionReport {
    let _span = info_span!(
        "selection_simulation",
        trials = config.trials,
        entries = table.len()
    )
    .entered();
    let n = table.len();

    let (counts, max_gaps, empty) = (0..config.trials)
        .into_par_iter()
        .map(|trial| run_trial(table, config.picks_per_trial, trial_seed(config.base_seed, trial)))
        .fold(
            || (vec![0u64; n], vec![0u32; n], 0u64),
            |(mut counts, mut gaps, empty), outcome| {
                for i in 0..n {
                    counts[i] += outcome.counts[i];
                    gaps[i] = gaps[i].max(outcome.max_gaps[i]);
                }
                (counts, gaps, empty + outcome.empty)
            },
        )
        .reduce(
            || (vec![0u64; n], vec![0u32; n], 0u64),
            |(mut ca, mut ga, ea), (cb, gb, eb)| {
                for i in 0..n {
                    ca[i] += cb[i];
                    ga[i] = ga[i].max(gb[i]);
                }
                (ca, ga, ea + eb)
            },
        );

    let total_picks = config.trials * config.picks_per_trial as u64;
    let chosen_picks = total_picks.saturating_sub(empty);
    let total_weight = table.total_weight();

    let entries: Vec<EntryBalance> = table
        .entries()
        .iter()
        .enumerate()
        .map(|(i, e)| EntryBalance {
            name: e.name.clone(),
            weight: e.weight,
            guarantee_interval: e.guarantee_interval,
            expected_share: if total_weight > 0.0 {
                e.weight / total_weight
            } else {
                0.0
            },
            observed_share: if chosen_picks > 0 {
                counts[i] as f32 / chosen_picks as f32
            } else {
                0.0
            },
            picks: counts[i],
            max_gap: max_gaps[i],
        })
        .collect();

    let max_share_deviation = entries
        .iter()
        .map(|e| (e.observed_share - e.expected_share).abs())
        .fold(0.0, f32::max);
    let grade = BalanceGrade::from_deviation(max_share_deviation);

    info!(
        trials = config.trials,
        total_picks,
        empty,
        max_share_deviation,
        ?grade,
        "selection simulation complete"
    );

    SelectionReport {
        trials: config.trials,
        total_picks,
        empty_picks: empty,
        entries,
        max_share_deviation,
        grade,
    }
}
