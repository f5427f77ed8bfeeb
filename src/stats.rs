//! Bounded running statistics shared by every metric.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Number of samples kept for the rolling average (10 s at 30 fps).
pub const HISTORY_CAP: usize = 300;

/// current / max / min over the whole session, average over the last
/// `HISTORY_CAP` samples.
///
/// `max` and `min` are not rebuilt when old samples are evicted; only
/// `reset` clears them.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSeries {
    pub current: f64,
    pub max: f64,
    pub min: f64,
    values: VecDeque<f64>,
    pub average: f64,
}

impl MetricSeries {
    pub fn new() -> Self {
        Self {
            current: 0.0,
            max: 0.0,
            min: f64::INFINITY,
            values: VecDeque::with_capacity(HISTORY_CAP),
            average: 0.0,
        }
    }

    /// Fold one sample in. `None` and NaN are ignored.
    pub fn record(&mut self, value: Option<f64>) {
        let value = match value {
            Some(v) if !v.is_nan() => v,
            _ => return,
        };
        self.current = value;
        self.max = self.max.max(value);
        self.min = self.min.min(value);

        self.values.push_back(value);
        if self.values.len() > HISTORY_CAP {
            self.values.pop_front();
        }
        // 差分更新だと丸め誤差が蓄積するので毎回窓全体から求める
        self.average = self.values.iter().sum::<f64>() / self.values.len() as f64;
    }

    /// Update only the displayed value, leaving aggregates untouched.
    pub fn set_current(&mut self, value: f64) {
        if !value.is_nan() {
            self.current = value;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn values(&self) -> &VecDeque<f64> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn snapshot(&self) -> SeriesSnapshot {
        SeriesSnapshot {
            current: self.current,
            max: (!self.is_empty()).then_some(self.max),
            min: self.min.is_finite().then_some(self.min),
            average: self.average,
            samples: self.values.len(),
        }
    }
}

impl Default for MetricSeries {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable read-only view; an untouched `min` is `None` instead of infinity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesSnapshot {
    pub current: f64,
    pub max: Option<f64>,
    pub min: Option<f64>,
    pub average: f64,
    pub samples: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombinedStats {
    pub max: f64,
    pub min: f64,
    pub mean: f64,
}

/// max / min / mean over the union of several series' retained values.
pub fn combined(series: &[&MetricSeries]) -> Option<CombinedStats> {
    let mut count = 0usize;
    let mut sum = 0.0;
    let mut max = f64::NEG_INFINITY;
    let mut min = f64::INFINITY;
    for v in series.iter().flat_map(|s| s.values().iter()) {
        count += 1;
        sum += v;
        max = max.max(*v);
        min = min.min(*v);
    }
    (count > 0).then(|| CombinedStats {
        max,
        min,
        mean: sum / count as f64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_new_series() {
        let s = MetricSeries::new();
        assert_eq!(s.current, 0.0);
        assert_eq!(s.max, 0.0);
        assert_eq!(s.min, f64::INFINITY);
        assert!(s.is_empty());
        assert_eq!(s.average, 0.0);
    }

    #[test]
    fn test_record_updates_all_fields() {
        let mut s = MetricSeries::new();
        s.record(Some(10.0));
        s.record(Some(20.0));
        s.record(Some(15.0));
        assert_eq!(s.current, 15.0);
        assert_eq!(s.max, 20.0);
        assert_eq!(s.min, 10.0);
        assert!(approx_eq(s.average, 15.0));
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn test_none_and_nan_are_ignored() {
        let mut s = MetricSeries::new();
        s.record(Some(5.0));
        let before = s.clone();
        s.record(None);
        s.record(Some(f64::NAN));
        assert_eq!(s, before);
    }

    #[test]
    fn test_cap_drops_oldest() {
        let mut s = MetricSeries::new();
        for i in 0..=HISTORY_CAP {
            s.record(Some(i as f64));
        }
        assert_eq!(s.len(), HISTORY_CAP);
        assert_eq!(s.values().front().copied(), Some(1.0));
        assert_eq!(s.values().back().copied(), Some(HISTORY_CAP as f64));
    }

    #[test]
    fn test_extremes_survive_eviction() {
        let mut s = MetricSeries::new();
        s.record(Some(1000.0));
        s.record(Some(-5.0));
        for _ in 0..HISTORY_CAP {
            s.record(Some(50.0));
        }
        assert_eq!(s.max, 1000.0);
        assert_eq!(s.min, -5.0);
        assert!(approx_eq(s.average, 50.0));
    }

    #[test]
    fn test_set_current_leaves_aggregates() {
        let mut s = MetricSeries::new();
        s.record(Some(80.0));
        s.set_current(300.0);
        assert_eq!(s.current, 300.0);
        assert_eq!(s.max, 80.0);
        assert_eq!(s.min, 80.0);
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_reset() {
        let mut s = MetricSeries::new();
        s.record(Some(3.0));
        s.reset();
        assert_eq!(s, MetricSeries::new());
    }

    #[test]
    fn test_snapshot_hides_infinite_min() {
        let snap = MetricSeries::new().snapshot();
        assert_eq!(snap.min, None);
        assert_eq!(snap.max, None);
        assert_eq!(snap.samples, 0);
    }

    #[test]
    fn test_combined() {
        let mut a = MetricSeries::new();
        let mut b = MetricSeries::new();
        a.record(Some(30.0));
        b.record(Some(40.0));
        b.record(Some(50.0));
        let stats = combined(&[&a, &b]).unwrap();
        assert_eq!(stats.max, 50.0);
        assert_eq!(stats.min, 30.0);
        assert!(approx_eq(stats.mean, 40.0));
        assert!(combined(&[&MetricSeries::new()]).is_none());
    }

    proptest! {
        #[test]
        fn prop_average_matches_window_mean(values in proptest::collection::vec(-500.0f64..500.0, 1..700)) {
            let mut s = MetricSeries::new();
            for (i, v) in values.iter().enumerate() {
                s.record(Some(*v));
                let start = (i + 1).saturating_sub(HISTORY_CAP);
                let window = &values[start..=i];
                let mean = window.iter().sum::<f64>() / window.len() as f64;
                prop_assert!((s.average - mean).abs() < 1e-6);
                prop_assert_eq!(s.len(), window.len());
            }
        }
    }
}
