//! Walking-pole reconstruction from the hand alone.
//!
//! No pole is tracked, so the ground-contact point is inferred from the grip
//! point, the ground line under the feet and the view's travel direction.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::pose::{Frame, Landmark, Side};
use crate::view::View;

/// 足首が見えないときの地面ライン（画面下端）
const FALLBACK_GROUND_Y: f64 = 1.0;

/// 接地点オフセット（フレーム幅比）: 腕が前 / 後ろ
const CONTACT_OFFSET_FORWARD: f64 = 0.15;
const CONTACT_OFFSET_BACKWARD: f64 = 0.25;

/// 前腕角への補正（度）: 前振り / 後ろ振り
const FOREARM_OFFSET_FORWARD_DEG: f64 = 18.0;
const FOREARM_OFFSET_BACKWARD_DEG: f64 = -12.0;

/// How the ground-contact point is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoleModel {
    /// Fixed fraction of frame width behind the grip, on the ground line.
    #[default]
    GroundLine,
    /// Forearm direction plus a fixed biomechanical offset, projected to the
    /// ground line.
    ForearmOffset,
}

/// Where the hand holds the pole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GripPoint {
    #[default]
    Wrist,
    /// 70% wrist, 30% thumb-side hand landmark.
    WristHandBlend,
}

/// Reconstructed pole for one arm, in normalized image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoleGeometry {
    pub side: Side,
    pub grip: Point2<f64>,
    pub contact: Point2<f64>,
    /// Angle from vertical at the grip, measured in pixel space.
    pub angle_deg: f64,
    pub arm_forward: bool,
}

/// Ground line Y (the lower foot) when both ankles are usable.
pub fn ground_line_y(frame: &Frame) -> Option<f64> {
    let left = frame.usable(Side::Left.ankle())?;
    let right = frame.usable(Side::Right.ankle())?;
    Some(left.y.max(right.y))
}

struct Arm<'a> {
    side: Side,
    shoulder: &'a Landmark,
    elbow: Option<&'a Landmark>,
    wrist: &'a Landmark,
    /// 深度の手がかりに使う手（親指、なければ手首）
    hand: &'a Landmark,
    grip: Point2<f64>,
}

impl<'a> Arm<'a> {
    fn from_frame(frame: &'a Frame, side: Side, grip_point: GripPoint) -> Option<Self> {
        let shoulder = frame.usable(side.shoulder())?;
        let wrist = frame.usable(side.wrist())?;
        let thumb = frame.usable(side.thumb());
        let grip = match (grip_point, thumb) {
            (GripPoint::WristHandBlend, Some(thumb)) => Point2::new(
                wrist.x * 0.7 + thumb.x * 0.3,
                wrist.y * 0.7 + thumb.y * 0.3,
            ),
            _ => wrist.xy(),
        };
        Some(Self {
            side,
            shoulder,
            elbow: frame.usable(side.elbow()),
            wrist,
            hand: thumb.unwrap_or(wrist),
            grip,
        })
    }

    /// 進行方向側に手があるか（側面: 手首x、正面/背面: 手の深度z）
    fn is_forward(&self, view: View) -> bool {
        let delta = if view.is_lateral() {
            self.wrist.x - self.shoulder.x
        } else {
            self.hand.z - self.shoulder.z
        };
        delta * view.forward_sign() > 0.0
    }

    /// Pulls a lateral contact back to the shoulder if it lands ahead of it.
    fn behind_shoulder(&self, contact_x: f64, view: View) -> f64 {
        if !view.is_lateral() {
            return contact_x;
        }
        if (contact_x - self.shoulder.x) * view.forward_sign() > 0.0 {
            self.shoulder.x
        } else {
            contact_x
        }
    }
}

pub struct PoleEstimator {
    model: PoleModel,
    grip_point: GripPoint,
    frame_width: f64,
    frame_height: f64,
    pixels_per_cm: f64,
}

impl PoleEstimator {
    pub fn new(model: PoleModel, grip_point: GripPoint) -> Self {
        Self::from_config(&AnalysisConfig {
            pole_model: model,
            grip_point,
            ..AnalysisConfig::default()
        })
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            model: config.pole_model,
            grip_point: config.grip_point,
            frame_width: config.frame_width as f64,
            frame_height: config.frame_height as f64,
            pixels_per_cm: config.pixels_per_cm,
        }
    }

    /// Pole for one arm. `None` if the arm is not visible or the geometry
    /// degenerates (grip at or below the ground line).
    pub fn compute(&self, frame: &Frame, view: View, side: Side) -> Option<PoleGeometry> {
        let arm = Arm::from_frame(frame, side, self.grip_point)?;
        let ground_y = ground_line_y(frame).unwrap_or(FALLBACK_GROUND_Y);
        if arm.grip.y >= ground_y {
            return None;
        }

        let arm_forward = arm.is_forward(view);
        let contact_x = match self.model {
            PoleModel::GroundLine => self.ground_line_contact(&arm, view, arm_forward),
            PoleModel::ForearmOffset => self.forearm_offset_contact(&arm, view, ground_y)?,
        };
        // 先端は肩より前に出さない
        let contact = Point2::new(arm.behind_shoulder(contact_x, view), ground_y);

        let dx = (contact.x - arm.grip.x) * self.frame_width;
        let dy = (contact.y - arm.grip.y) * self.frame_height;
        let angle_deg = dx.abs().atan2(dy).to_degrees();

        Some(PoleGeometry {
            side,
            grip: arm.grip,
            contact,
            angle_deg,
            arm_forward,
        })
    }

    fn ground_line_contact(&self, arm: &Arm, view: View, arm_forward: bool) -> f64 {
        let fraction = if arm_forward {
            CONTACT_OFFSET_FORWARD
        } else {
            CONTACT_OFFSET_BACKWARD
        };

        if view.is_lateral() {
            arm.grip.x - view.forward_sign() * fraction
        } else {
            arm.grip.x + view.outward_sign(arm.side) * fraction
        }
    }

    fn forearm_offset_contact(&self, arm: &Arm, view: View, ground_y: f64) -> Option<f64> {
        let elbow = arm.elbow?;
        let forearm_x = arm.wrist.x - elbow.x;
        let forearm_y = arm.wrist.y - elbow.y;
        let arm_angle = forearm_x.atan2(forearm_y.abs()).to_degrees();
        let offset = if arm_angle > 0.0 {
            FOREARM_OFFSET_FORWARD_DEG
        } else {
            FOREARM_OFFSET_BACKWARD_DEG
        };
        let pole_angle = arm_angle + offset;
        if pole_angle.abs() >= 90.0 {
            return None;
        }

        let direction = match view {
            View::Left => -1.0,
            View::Right => 1.0,
            View::Front if arm.hand.z < arm.shoulder.z => 1.0,
            View::Back if arm.hand.z > arm.shoulder.z => 1.0,
            View::Front | View::Back => -1.0,
        };
        let length_px = (ground_y - arm.grip.y) * self.frame_height;
        let horizontal_px = length_px * pole_angle.to_radians().tan() * direction;
        Some(arm.grip.x + horizontal_px / self.frame_width)
    }

    /// Distance (cm) from the contact point to the forward foot, lateral views only.
    pub fn stride_position_cm(&self, frame: &Frame, view: View, contact_x: f64) -> Option<f64> {
        if !view.is_lateral() {
            return None;
        }
        let left = frame.usable(Side::Left.ankle())?.x;
        let right = frame.usable(Side::Right.ankle())?.x;
        let forward_foot = if view == View::Left {
            left.min(right)
        } else {
            left.max(right)
        };
        Some((contact_x - forward_foot).abs() * self.frame_width / self.pixels_per_cm)
    }
}
