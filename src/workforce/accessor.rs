//! Read-only view over a possibly-absent dataset.
//!
//! Every operation tolerates a missing dataset and missing or unparseable
//! field values: such records are skipped, never counted as zero.

use serde::{Deserialize, Serialize};

use super::record::{Dataset, Field, Record};

/// Comparison direction for threshold filters. Both are strict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Greater,
    Less,
}

impl Direction {
    /// Whether `value` passes the threshold in this direction.
    pub fn admits(&self, value: f64, threshold: f64) -> bool {
        match self {
            Direction::Greater => value > threshold,
            Direction::Less => value < threshold,
        }
    }
}

/// Category counts in first-seen order.
pub type GroupCounts = Vec<(String, usize)>;

/// Accessor over the resolved dataset (or none).
#[derive(Debug, Clone, Copy)]
pub struct DatasetAccessor<'a> {
    dataset: Option<&'a Dataset>,
}

impl<'a> DatasetAccessor<'a> {
    pub fn new(dataset: Option<&'a Dataset>) -> Self {
        Self { dataset }
    }

    /// Whether a dataset is present at all.
    pub fn is_present(&self) -> bool {
        self.dataset.is_some()
    }

    fn records(&self) -> impl Iterator<Item = &'a Record> {
        self.dataset.into_iter().flat_map(|d| d.records.iter())
    }

    /// Number of records satisfying `predicate`.
    pub fn count<P>(&self, predicate: P) -> usize
    where
        P: Fn(&Record) -> bool,
    {
        self.records().filter(|&r| predicate(r)).count()
    }

    /// Count records per distinct non-empty value of `field`.
    pub fn group_count(&self, field: Field) -> GroupCounts {
        let mut counts: GroupCounts = Vec::new();
        for value in self.records().filter_map(|r| r.text(field)) {
            match counts.iter_mut().find(|(k, _)| k == value) {
                Some((_, n)) => *n += 1,
                None => counts.push((value.to_string(), 1)),
            }
        }
        counts
    }

    /// All parseable numeric values of `field`.
    pub fn numeric_values(&self, field: Field) -> Vec<f64> {
        self.records().filter_map(|r| r.number(field)).collect()
    }

    /// Records whose numeric `field` passes `threshold` in `direction`.
    pub fn filter_by_threshold(
        &self,
        field: Field,
        threshold: f64,
        direction: Direction,
    ) -> Vec<&'a Record> {
        if !threshold.is_finite() {
            return Vec::new();
        }
        let matched: Vec<&'a Record> = self
            .records()
            .filter(|r| {
                r.number(field)
                    .is_some_and(|v| direction.admits(v, threshold))
            })
            .collect();
        tracing::debug!(
            field = field.key(),
            threshold,
            direction = ?direction,
            matched = matched.len(),
            "threshold filter"
        );
        matched
    }

    /// Non-empty text values of `field`, in record order.
    pub fn texts(&self, field: Field) -> Vec<&'a str> {
        self.records().filter_map(|r| r.text(field)).collect()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
