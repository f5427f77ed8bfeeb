//! Per-session state and the synchronous frame pipeline.
//!
//! `step` is a pure transition from one `SessionState` to the next; `Session`
//! owns the state and adds frame de-duplication, view switching and reset.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::AnalysisConfig;
use crate::pose::{Frame, LandmarkIndex, Side};
use crate::stats::{combined, CombinedStats, MetricSeries, SeriesSnapshot};
use crate::tracker::{
    ground_line_y, AngleCalculator, AngleSet, ComSample, ComTracker, GripTracker, PoleEstimator,
    PoleGeometry, StrideEstimator,
};
use crate::view::{AngleKey, AngleStatus, View, POLE_ANGLE_RANGE};

/// ポール関連の統計
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoleSeries {
    pub left: MetricSeries,
    pub right: MetricSeries,
    /// Contact point to forward foot (cm), both sides pooled.
    pub stride_position: MetricSeries,
}

impl PoleSeries {
    fn side_mut(&mut self, side: Side) -> &mut MetricSeries {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

/// Everything accumulated over one loaded source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub angles: [MetricSeries; AngleKey::COUNT],
    pub com: ComTracker,
    pub stride: MetricSeries,
    pub poles: PoleSeries,
    pub grip: GripTracker,
    pub frames_processed: u64,
    pub frames_skipped: u64,
}

impl SessionState {
    pub fn angle(&self, key: AngleKey) -> &MetricSeries {
        &self.angles[key as usize]
    }
}

/// Estimators configured for one session.
pub struct Pipeline {
    angles: AngleCalculator,
    stride: StrideEstimator,
    poles: PoleEstimator,
}

impl Pipeline {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            angles: AngleCalculator::from_config(config),
            stride: StrideEstimator::from_config(config),
            poles: PoleEstimator::from_config(config),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AngleReading {
    pub key: AngleKey,
    /// Display name from the view table.
    pub label: String,
    pub value: Option<f64>,
    pub status: Option<AngleStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoleReading {
    pub geometry: PoleGeometry,
    pub status: AngleStatus,
    pub stride_position_cm: Option<f64>,
}

/// Per-frame output handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameMetrics {
    pub frame_index: Option<u64>,
    pub timestamp_ms: u64,
    pub view: View,
    /// Every angle key; keys outside the view are `None`.
    pub angles: AngleSet,
    /// Angles of the active view with their health status.
    pub readings: Vec<AngleReading>,
    pub com: Option<ComSample>,
    pub stride_cm: Option<f64>,
    pub poles: Vec<PoleReading>,
    pub grip: GripTracker,
    /// 地面ライン（両足首が見えるとき）
    pub ground_y: Option<f64>,
    /// 体の中心線（鼻のx）
    pub midline_x: Option<f64>,
}

/// One frame through every estimator.
pub fn step(
    mut state: SessionState,
    frame: &Frame,
    pipeline: &Pipeline,
    view: View,
) -> (SessionState, FrameMetrics) {
    let view_config = view.config();

    let angles = pipeline.angles.compute(frame, view);
    let mut readings = Vec::with_capacity(view_config.angles.len());
    for def in view_config.angles {
        let value = angles.get(def.key);
        state.angles[def.key as usize].record(value);
        readings.push(AngleReading {
            key: def.key,
            label: def.label.to_string(),
            value,
            status: value.map(|v| AngleStatus::classify(v, def.range)),
        });
    }

    let com = state.com.update(frame);
    if com.is_none() {
        debug!("no weighted landmark visible, centre of mass unchanged");
    }

    let stride_cm = pipeline.stride.update(frame, view, &mut state.stride);

    let mut poles = Vec::with_capacity(2);
    for side in Side::BOTH {
        let geometry = match pipeline.poles.compute(frame, view, side) {
            Some(g) => g,
            None => continue,
        };
        state.poles.side_mut(side).record(Some(geometry.angle_deg));
        let stride_position_cm = pipeline
            .poles
            .stride_position_cm(frame, view, geometry.contact.x);
        state.poles.stride_position.record(stride_position_cm);
        poles.push(PoleReading {
            geometry,
            status: AngleStatus::classify(geometry.angle_deg, POLE_ANGLE_RANGE),
            stride_position_cm,
        });
    }

    state.grip.update(frame, view);
    state.frames_processed += 1;

    let metrics = FrameMetrics {
        frame_index: frame.frame_index(),
        timestamp_ms: frame.timestamp_ms,
        view,
        angles,
        readings,
        com,
        stride_cm,
        poles,
        grip: state.grip.clone(),
        ground_y: ground_line_y(frame),
        midline_x: frame.usable(LandmarkIndex::Nose).map(|nose| nose.x),
    };
    (state, metrics)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoleSnapshot {
    pub left: SeriesSnapshot,
    pub right: SeriesSnapshot,
    pub stride_position: SeriesSnapshot,
    /// Left and right pooled.
    pub combined: Option<CombinedStats>,
}

/// Read-only view of the whole session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub view: View,
    pub frames_processed: u64,
    pub frames_skipped: u64,
    /// Series of the active view's angles.
    pub angles: BTreeMap<AngleKey, SeriesSnapshot>,
    pub stride: SeriesSnapshot,
    pub poles: PoleSnapshot,
    pub com: Option<ComSample>,
    pub com_trail: Vec<ComSample>,
    pub grip: GripTracker,
}

impl SessionSnapshot {
    pub fn capture(state: &SessionState, view: View) -> Self {
        let angles = view
            .config()
            .angles
            .iter()
            .map(|def| (def.key, state.angle(def.key).snapshot()))
            .collect();
        Self {
            view,
            frames_processed: state.frames_processed,
            frames_skipped: state.frames_skipped,
            angles,
            stride: state.stride.snapshot(),
            poles: PoleSnapshot {
                left: state.poles.left.snapshot(),
                right: state.poles.right.snapshot(),
                stride_position: state.poles.stride_position.snapshot(),
                combined: combined(&[&state.poles.left, &state.poles.right]),
            },
            com: state.com.current(),
            com_trail: state.com.trail().iter().copied().collect(),
            grip: state.grip.clone(),
        }
    }
}

/// Metrics for one processed frame plus the session totals after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub metrics: FrameMetrics,
    pub snapshot: SessionSnapshot,
}

/// 解析セッション（1つの入力ソースに対応）
pub struct Session {
    pipeline: Pipeline,
    view: View,
    state: SessionState,
    last_frame_index: Option<u64>,
}

impl Session {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            pipeline: Pipeline::from_config(config),
            view: config.view,
            state: SessionState::default(),
            last_frame_index: None,
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Switches the active view. Series of angles outside the new view are
    /// kept as they are and simply stop updating.
    pub fn set_view(&mut self, view: View) {
        if view != self.view {
            info!("view switched: {} -> {}", self.view, view);
            self.view = view;
        }
    }

    /// Drops all accumulated state, e.g. when a new source is loaded.
    pub fn reset(&mut self) {
        self.state = SessionState::default();
        self.last_frame_index = None;
        info!("session reset ({} view)", self.view);
    }

    /// Runs one frame. `None` when the frame repeats the last processed
    /// frame index (paused or slow playback).
    pub fn process(&mut self, frame: &Frame) -> Option<FrameReport> {
        let frame_index = frame.frame_index();
        if let Some(index) = frame_index {
            if self.last_frame_index == Some(index) {
                debug!("duplicate frame index {}, skipped", index);
                return None;
            }
        }

        let state = std::mem::take(&mut self.state);
        let (state, metrics) = step(state, frame, &self.pipeline, self.view);
        self.state = state;
        if frame_index.is_some() {
            self.last_frame_index = frame_index;
        }

        Some(FrameReport {
            metrics,
            snapshot: self.snapshot(),
        })
    }

    /// The pose estimator produced nothing for this frame.
    pub fn pose_failed(&mut self) {
        self.state.frames_skipped += 1;
        warn!(
            "pose estimation failed, keeping last state (skipped {})",
            self.state.frames_skipped
        );
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::capture(&self.state, self.view)
    }
}
