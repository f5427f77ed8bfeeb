//! Per-arm swing phase and grip classification with consistency and
//! two-arm coordination scoring.

use nalgebra::distance;
use serde::{Deserialize, Serialize};

use crate::geometry::{length_ratio, sign_with_deadband};
use crate::pose::{Frame, Side};
use crate::view::View;

/// 手の開き具合がこれ未満なら握っている
pub const GRIP_THRESHOLD: f64 = 0.6;

/// 前後判定の不感帯（正規化座標）
pub const PHASE_DEADBAND: f64 = 0.05;

/// 深度も側面情報も無いときの高さによる判定しきい値
const FALLBACK_FORWARD_RISE: f64 = 0.1;
const FALLBACK_BACKWARD_DROP: f64 = -0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwingPhase {
    Forward,
    Backward,
    Transition,
    #[default]
    Unknown,
}

impl SwingPhase {
    /// Forward or Backward.
    pub fn is_definite(self) -> bool {
        matches!(self, SwingPhase::Forward | SwingPhase::Backward)
    }

    fn from_sign(sign: i8) -> Self {
        match sign {
            1 => SwingPhase::Forward,
            -1 => SwingPhase::Backward,
            _ => SwingPhase::Transition,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GripStatus {
    Gripping,
    Open,
    #[default]
    Unknown,
}

impl GripStatus {
    pub fn from_openness(openness: Option<f64>) -> Self {
        match openness {
            Some(v) if v < GRIP_THRESHOLD => GripStatus::Gripping,
            Some(_) => GripStatus::Open,
            None => GripStatus::Unknown,
        }
    }
}

/// Thumb-to-pinky spread over wrist-to-index length.
pub fn hand_openness(frame: &Frame, side: Side) -> Option<f64> {
    let thumb = frame.usable(side.thumb())?;
    let pinky = frame.usable(side.pinky())?;
    let wrist = frame.usable(side.wrist())?;
    let index = frame.usable(side.index_finger())?;
    length_ratio(
        distance(&thumb.xy(), &pinky.xy()),
        distance(&wrist.xy(), &index.xy()),
    )
}

/// View-dependent swing phase for one arm.
pub fn classify_phase(frame: &Frame, view: View, side: Side) -> SwingPhase {
    let (shoulder, wrist) = match (frame.usable(side.shoulder()), frame.usable(side.wrist())) {
        (Some(s), Some(w)) => (s, w),
        _ => return SwingPhase::Unknown,
    };

    let cue = if view.is_lateral() {
        frame
            .usable(side.hip())
            .map(|hip| wrist.x - (shoulder.x + hip.x) / 2.0)
    } else if frame.has_depth() {
        Some(wrist.z - shoulder.z)
    } else {
        None
    };

    match cue {
        Some(delta) => {
            let sign = sign_with_deadband(delta, PHASE_DEADBAND) as f64 * view.forward_sign();
            SwingPhase::from_sign(sign as i8)
        }
        None => {
            // 手首が肩より高いほど前に振っている
            let rise = shoulder.y - wrist.y;
            if rise > FALLBACK_FORWARD_RISE {
                SwingPhase::Forward
            } else if rise < FALLBACK_BACKWARD_DROP {
                SwingPhase::Backward
            } else {
                SwingPhase::Transition
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SwingConsistency {
    /// Frames in this phase with the expected grip.
    pub matched: u32,
    pub total: u32,
    pub percentage: f64,
}

impl SwingConsistency {
    fn count(&mut self, matched: bool) {
        self.total += 1;
        if matched {
            self.matched += 1;
        }
        self.percentage = self.matched as f64 / self.total as f64 * 100.0;
    }
}

/// 片腕のグリップ状態
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ArmGripState {
    pub phase: SwingPhase,
    pub grip: GripStatus,
    pub openness: Option<f64>,
    /// Forward frames; `matched` counts gripping.
    pub forward_swing: SwingConsistency,
    /// Backward frames; `matched` counts open.
    pub backward_swing: SwingConsistency,
}

impl ArmGripState {
    fn observe(&mut self, phase: SwingPhase, openness: Option<f64>) {
        self.phase = phase;
        self.openness = openness;
        self.grip = GripStatus::from_openness(openness);
        match phase {
            SwingPhase::Forward => self.forward_swing.count(self.grip == GripStatus::Gripping),
            SwingPhase::Backward => self.backward_swing.count(self.grip == GripStatus::Open),
            SwingPhase::Transition | SwingPhase::Unknown => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CoordinationState {
    pub synchronized: u32,
    pub total: u32,
    pub percentage: f64,
}

impl CoordinationState {
    fn score(&mut self, left: &ArmGripState, right: &ArmGripState) {
        if !left.phase.is_definite() || !right.phase.is_definite() {
            return;
        }
        self.total += 1;
        if is_synchronized(left, right) {
            self.synchronized += 1;
        }
        self.percentage = self.synchronized as f64 / self.total as f64 * 100.0;
    }
}

/// Opposite phases, forward arm gripping and backward arm open.
fn is_synchronized(left: &ArmGripState, right: &ArmGripState) -> bool {
    let (forward, backward) = match (left.phase, right.phase) {
        (SwingPhase::Forward, SwingPhase::Backward) => (left, right),
        (SwingPhase::Backward, SwingPhase::Forward) => (right, left),
        _ => return false,
    };
    forward.grip == GripStatus::Gripping && backward.grip == GripStatus::Open
}

/// 両腕のグリップ/位相とその協調
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GripTracker {
    pub left: ArmGripState,
    pub right: ArmGripState,
    pub coordination: CoordinationState,
}

impl GripTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, frame: &Frame, view: View) {
        for side in Side::BOTH {
            let phase = classify_phase(frame, view, side);
            let openness = hand_openness(frame, side);
            self.arm_mut(side).observe(phase, openness);
        }
        self.coordination.score(&self.left, &self.right);
    }

    pub fn arm(&self, side: Side) -> &ArmGripState {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    fn arm_mut(&mut self, side: Side) -> &mut ArmGripState {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}
