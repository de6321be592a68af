use std::collections::HashMap;

use insight_protocol::Record;
use serde::Serialize;

/// One labelled point of a chart series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint<T> {
    pub label: String,
    pub value: T,
}

impl<T> SeriesPoint<T> {
    pub fn new(label: impl Into<String>, value: T) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// How zero readings of a metric are treated when averaging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ZeroMetric {
    /// Zero counts as "no reading", matching the dashboard's historical output.
    #[default]
    Skip,
    /// Zero is a real measurement and contributes to the mean.
    Include,
}

/// Value → record count, in the order values were first seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryCounts {
    entries: Vec<(String, u64)>,
}

impl CategoryCounts {
    pub fn get(&self, label: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, n)| *n)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.entries.iter().map(|(l, n)| (l.as_str(), *n))
    }

    /// Sum over every bucket.
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, n)| n).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Group value → mean metric, in the order groups were first seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupAverages {
    entries: Vec<(String, f64)>,
}

impl GroupAverages {
    pub fn get(&self, label: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.entries.iter().map(|(l, v)| (l.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Points ordered by label as plain strings ("10" sorts before "9").
    pub fn sorted_by_label(&self) -> Vec<SeriesPoint<f64>> {
        let mut points: Vec<SeriesPoint<f64>> = self
            .entries
            .iter()
            .map(|(l, v)| SeriesPoint::new(l.clone(), *v))
            .collect();
        points.sort_by(|a, b| a.label.cmp(&b.label));
        points
    }
}

/// Count records per distinct value of `field`. Records without a value are skipped.
pub fn category_counts(records: &[Record], field: &str) -> CategoryCounts {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut entries: Vec<(String, u64)> = Vec::new();
    for record in records {
        let Some(label) = record.text(field) else {
            continue;
        };
        match index.get(label.as_ref()) {
            Some(&slot) => entries[slot].1 += 1,
            None => {
                index.insert(label.to_string(), entries.len());
                entries.push((label.into_owned(), 1));
            }
        }
    }
    CategoryCounts { entries }
}

/// Mean of `metric` per distinct value of `group`.
///
/// A record contributes only when it has both a group value and a numeric
/// metric; under [`ZeroMetric::Skip`] a zero metric is treated as missing.
/// Groups without any contributing record do not appear.
pub fn grouped_average(
    records: &[Record],
    group: &str,
    metric: &str,
    zeros: ZeroMetric,
) -> GroupAverages {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut sums: Vec<(String, f64, u64)> = Vec::new();
    for record in records {
        let Some(label) = record.text(group) else {
            continue;
        };
        let Some(value) = record.metric(metric) else {
            continue;
        };
        if zeros == ZeroMetric::Skip && value == 0.0 {
            continue;
        }
        match index.get(label.as_ref()) {
            Some(&slot) => {
                sums[slot].1 += value;
                sums[slot].2 += 1;
            }
            None => {
                index.insert(label.to_string(), sums.len());
                sums.push((label.into_owned(), value, 1));
            }
        }
    }
    GroupAverages {
        entries: sums
            .into_iter()
            .map(|(label, sum, n)| (label, sum / n as f64))
            .collect(),
    }
}

/// The `n` most frequent values, count descending; ties keep first-seen order.
pub fn top_n(counts: &CategoryCounts, n: usize) -> Vec<SeriesPoint<u64>> {
    let mut ranked: Vec<SeriesPoint<u64>> = counts
        .iter()
        .map(|(label, count)| SeriesPoint::new(label, count))
        .collect();
    // sort_by is stable, which is what keeps ties in first-seen order
    ranked.sort_by(|a, b| b.value.cmp(&a.value));
    ranked.truncate(n);
    ranked
}
