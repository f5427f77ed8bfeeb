use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::pose::{Frame, LandmarkIndex};

/// 軌跡を保持する時間幅（ミリ秒）
pub const TRAIL_WINDOW_MS: u64 = 500;

/// 重心推定に使う部位と重み
const SEGMENT_WEIGHTS: [(LandmarkIndex, f64); 9] = [
    (LandmarkIndex::Nose, 0.08),
    (LandmarkIndex::LeftShoulder, 0.05),
    (LandmarkIndex::RightShoulder, 0.05),
    (LandmarkIndex::LeftElbow, 0.05),
    (LandmarkIndex::RightElbow, 0.05),
    (LandmarkIndex::LeftHip, 0.25),
    (LandmarkIndex::RightHip, 0.25),
    (LandmarkIndex::LeftKnee, 0.08),
    (LandmarkIndex::RightKnee, 0.08),
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub timestamp_ms: u64,
}

/// Weighted segment centroid, renormalized over the visible segments.
pub fn estimate(frame: &Frame) -> Option<ComSample> {
    let mut total = 0.0;
    let (mut x, mut y, mut z) = (0.0, 0.0, 0.0);
    for (index, weight) in SEGMENT_WEIGHTS {
        if let Some(lm) = frame.usable(index) {
            x += lm.x * weight;
            y += lm.y * weight;
            z += lm.z * weight;
            total += weight;
        }
    }
    if total <= 0.0 {
        return None;
    }
    Some(ComSample {
        x: x / total,
        y: y / total,
        z: z / total,
        timestamp_ms: frame.timestamp_ms,
    })
}

/// 重心と直近の軌跡
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComTracker {
    current: Option<ComSample>,
    trail: VecDeque<ComSample>,
}

impl ComTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the fresh sample, or `None` when nothing weighted was visible
    /// (the previous CoM and trail are kept as they are).
    pub fn update(&mut self, frame: &Frame) -> Option<ComSample> {
        let sample = estimate(frame)?;
        self.current = Some(sample);
        self.trail.push_back(sample);

        // シーク後は順序が崩れるので先頭だけでなく全体を見る
        let newest = sample.timestamp_ms;
        self.trail.retain(|s| newest.saturating_sub(s.timestamp_ms) < TRAIL_WINDOW_MS);
        Some(sample)
    }

    pub fn current(&self) -> Option<ComSample> {
        self.current
    }

    pub fn trail(&self) -> &VecDeque<ComSample> {
        &self.trail
    }
}
