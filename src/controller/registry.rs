//! Weighted selection table with guarantee intervals.
//!
//! Kept apart from the behavior boxes so selection can be cloned and
//! simulated on its own (see `balance`).

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Per-attack selection parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub weight: f32,
    /// Force this attack after this many picks of others (0 = never)
    pub guarantee_interval: u32,
    /// Lower wins when several guarantees are due
    pub guarantee_priority: i32,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            weight: 1.0,
            guarantee_interval: 0,
            guarantee_priority: 0,
        }
    }
}

impl SelectionConfig {
    pub fn weighted(weight: f32) -> Self {
        Self {
            weight,
            ..Default::default()
        }
    }

    pub fn guaranteed(weight: f32, interval: u32, priority: i32) -> Self {
        Self {
            weight,
            guarantee_interval: interval,
            guarantee_priority: priority,
        }
    }
}

fn clamp_weight(weight: f32) -> f32 {
    if weight.is_finite() {
        weight.max(0.0)
    } else {
        0.0
    }
}

/// One registered attack's selection state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionEntry {
    pub name: String,
    pub weight: f32,
    pub guarantee_interval: u32,
    pub guarantee_priority: i32,
    /// Picks of other entries since this one was last chosen
    pub since_last_use: u32,
}

impl SelectionEntry {
    pub fn guarantee_due(&self) -> bool {
        self.guarantee_interval > 0 && self.since_last_use >= self.guarantee_interval
    }
}

/// Registry entries in registration order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionTable {
    entries: Vec<SelectionEntry>,
}

impl SelectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry; returns its index
    pub fn push(&mut self, name: impl Into<String>, config: SelectionConfig) -> usize {
        self.entries.push(SelectionEntry {
            name: name.into(),
            weight: clamp_weight(config.weight),
            guarantee_interval: config.guarantee_interval,
            guarantee_priority: config.guarantee_priority,
            since_last_use: 0,
        });
        self.entries.len() - 1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[SelectionEntry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&SelectionEntry> {
        self.entries.get(index)
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    pub fn total_weight(&self) -> f32 {
        self.entries.iter().map(|e| e.weight).sum()
    }

    /// Roulette draw over positive weights. `None` when total weight is 0.
    pub fn pick_weighted<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<usize> {
        let total = self.total_weight();
        if !(total > 0.0) {
            return None;
        }
        let draw = rng.gen::<f32>() * total;
        let mut cumulative = 0.0;
        let mut last_positive = None;
        for (index, entry) in self.entries.iter().enumerate() {
            if entry.weight <= 0.0 {
                continue;
            }
            cumulative += entry.weight;
            last_positive = Some(index);
            if cumulative >= draw {
                return Some(index);
            }
        }
        // float rounding can leave the draw just past the final sum
        last_positive
    }

    /// Due guarantee with the lowest priority; ties keep registration order
    pub fn guaranteed(&self) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.guarantee_due())
            .min_by_key(|(index, e)| (e.guarantee_priority, *index))
            .map(|(index, _)| index)
    }

    /// Guarantee first, then weighted draw. Does not touch bookkeeping.
    pub fn select<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<usize> {
        self.guaranteed().or_else(|| self.pick_weighted(rng))
    }

    /// Reset the chosen entry's counter and age every other entry.
    /// Guaranteed entries stop aging at their interval.
    pub fn record_selection(&mut self, chosen: usize) {
        for (index, entry) in self.entries.iter_mut().enumerate() {
            if index == chosen {
                entry.since_last_use = 0;
            } else if entry.guarantee_interval > 0 {
                entry.since_last_use = (entry.since_last_use + 1).min(entry.guarantee_interval);
            } else {
                entry.since_last_use = entry.since_last_use.saturating_add(1);
            }
        }
    }

    /// `select` followed by `record_selection`
    pub fn next<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<usize> {
        let chosen = self.select(rng)?;
        self.record_selection(chosen);
        Some(chosen)
    }

    /// Weight is clamped to ≥ 0; guarantee bookkeeping is untouched
    pub fn set_weight(&mut self, index: usize, weight: f32) -> bool {
        match self.entries.get_mut(index) {
            Some(entry) => {
                entry.weight = clamp_weight(weight);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn rng() -> Xoshiro256PlusPlus {
        Xoshiro256PlusPlus::seed_from_u64(42)
    }

    fn table(weights: &[f32]) -> SelectionTable {
        let mut t = SelectionTable::new();
        for (i, w) in weights.iter().enumerate() {
            t.push(format!("a{i}"), SelectionConfig::weighted(*w));
        }
        t
    }

    #[test]
    fn test_empty_table_picks_nothing() {
        let t = SelectionTable::new();
        assert_eq!(t.pick_weighted(&mut rng()), None);
        assert_eq!(t.select(&mut rng()), None);
    }

    #[test]
    fn test_zero_total_weight_picks_nothing() {
        let t = table(&[0.0, 0.0]);
        assert_eq!(t.pick_weighted(&mut rng()), None);
    }

    #[test]
    fn test_zero_weight_entry_never_drawn() {
        let t = table(&[0.0, 1.0, 0.0]);
        let mut r = rng();
        for _ in 0..500 {
            assert_eq!(t.pick_weighted(&mut r), Some(1));
        }
    }

    #[test]
    fn test_equal_weights_converge() {
        let t = table(&[1.0, 1.0, 1.0]);
        let mut r = rng();
        let mut counts = [0u32; 3];
        for _ in 0..3000 {
            let i = t.pick_weighted(&mut r).unwrap();
            counts[i] += 1;
        }
        for c in counts {
            assert!((900..=1100).contains(&c), "count {c} outside tolerance");
        }
    }

    #[test]
    fn test_uneven_weights_converge() {
        let t = table(&[3.0, 1.0]);
        let mut r = rng();
        let n = 8000;
        let first = (0..n).filter(|_| t.pick_weighted(&mut r) == Some(0)).count();
        let share = first as f32 / n as f32;
        assert!((share - 0.75).abs() < 0.03, "share {share}");
    }

    #[test]
    fn test_guarantee_overrides_zero_weight() {
        let mut t = SelectionTable::new();
        t.push("a", SelectionConfig::guaranteed(0.0, 3, 0));
        t.push("b", SelectionConfig::weighted(1.0));
        let mut r = rng();
        let picks: Vec<usize> = (0..8).filter_map(|_| t.next(&mut r)).collect();
        assert_eq!(picks, vec![1, 1, 1, 0, 1, 1, 1, 0]);
    }

    #[test]
    fn test_guarantee_priority_and_order() {
        let mut t = SelectionTable::new();
        t.push("low", SelectionConfig::guaranteed(1.0, 1, 5));
        t.push("high", SelectionConfig::guaranteed(1.0, 1, 1));
        t.push("high_too", SelectionConfig::guaranteed(1.0, 1, 1));
        t.push("filler", SelectionConfig::weighted(1.0));
        t.record_selection(3);
        assert_eq!(t.guaranteed(), Some(1), "lowest priority, first registered");
    }

    #[test]
    fn test_record_selection_bookkeeping() {
        let mut t = table(&[1.0, 1.0, 1.0]);
        t.record_selection(0);
        t.record_selection(0);
        assert_eq!(t.entry(0).unwrap().since_last_use, 0);
        assert_eq!(t.entry(1).unwrap().since_last_use, 2);
        t.record_selection(1);
        assert_eq!(t.entry(1).unwrap().since_last_use, 0);
        assert_eq!(t.entry(2).unwrap().since_last_use, 3);
    }

    #[test]
    fn test_guarantee_counter_capped_at_interval() {
        let mut t = SelectionTable::new();
        t.push("finisher", SelectionConfig::guaranteed(1.0, 2, 0));
        t.push("jab", SelectionConfig::weighted(1.0));
        for _ in 0..5 {
            t.record_selection(1);
        }
        let finisher = t.entry(0).unwrap();
        assert_eq!(finisher.since_last_use, 2);
        assert!(finisher.guarantee_due());
        assert_eq!(t.entry(1).unwrap().since_last_use, 0);
    }

    #[test]
    fn test_set_weight_keeps_counters() {
        let mut t = table(&[1.0, 1.0]);
        t.record_selection(0);
        assert!(t.set_weight(1, -4.0));
        let e = t.entry(1).unwrap();
        assert_eq!(e.weight, 0.0, "clamped");
        assert_eq!(e.since_last_use, 1);
        assert!(t.set_weight(0, f32::NAN));
        assert_eq!(t.entry(0).unwrap().weight, 0.0);
        assert!(!t.set_weight(9, 1.0));
    }

    #[test]
    fn test_find() {
        let t = table(&[1.0, 2.0]);
        assert_eq!(t.find("a1"), Some(1));
        assert_eq!(t.find("zz"), None);
    }
}
