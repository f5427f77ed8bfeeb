use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::geometry::{
    angle_from_horizontal, heading_from_vertical, interior_angle, tilt_from_vertical,
};
use crate::pose::{Frame, Side};
use crate::view::{AngleKey, View};

/// Sign convention for the frontal trunk lean angle.
///
/// Two conventions are in use and neither has been settled by domain review,
/// so both stay selectable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrunkLeanConvention {
    /// `|atan2(dx, dy)|` of hip minus shoulder: ~0° when upright.
    #[default]
    Raw,
    /// Same vector measured from the upward vertical: ~180° when upright.
    Inverted,
}

impl TrunkLeanConvention {
    fn apply(self, raw_degrees: f64) -> f64 {
        match self {
            TrunkLeanConvention::Raw => raw_degrees,
            TrunkLeanConvention::Inverted => 180.0 - raw_degrees,
        }
    }
}

/// One angle value (or `None`) per `AngleKey`. Serialized as a map keyed by
/// the camelCase angle name.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(
    into = "BTreeMap<AngleKey, Option<f64>>",
    from = "BTreeMap<AngleKey, Option<f64>>"
)]
pub struct AngleSet {
    values: [Option<f64>; AngleKey::COUNT],
}

impl AngleSet {
    pub fn get(&self, key: AngleKey) -> Option<f64> {
        self.values[key as usize]
    }

    pub fn set(&mut self, key: AngleKey, value: Option<f64>) {
        self.values[key as usize] = value;
    }

    pub fn iter(&self) -> impl Iterator<Item = (AngleKey, Option<f64>)> + '_ {
        AngleKey::ALL.iter().map(move |k| (*k, self.get(*k)))
    }
}

impl From<AngleSet> for BTreeMap<AngleKey, Option<f64>> {
    fn from(set: AngleSet) -> Self {
        set.iter().collect()
    }
}

impl From<BTreeMap<AngleKey, Option<f64>>> for AngleSet {
    fn from(map: BTreeMap<AngleKey, Option<f64>>) -> Self {
        let mut set = AngleSet::default();
        for (key, value) in map {
            set.set(key, value);
        }
        set
    }
}

/// 関節角度の計算（ビューごとに対象の角度が異なる）
pub struct AngleCalculator {
    trunk_lean: TrunkLeanConvention,
}

impl AngleCalculator {
    pub fn new(trunk_lean: TrunkLeanConvention) -> Self {
        Self { trunk_lean }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.trunk_lean)
    }

    /// Angles relevant to `view`; keys belonging to other views stay `None`.
    pub fn compute(&self, frame: &Frame, view: View) -> AngleSet {
        let mut angles = AngleSet::default();
        match view {
            View::Front | View::Back => self.compute_frontal(frame, view, &mut angles),
            View::Left | View::Right => self.compute_lateral(frame, view, &mut angles),
        }
        angles
    }

    fn compute_frontal(&self, frame: &Frame, view: View, angles: &mut AngleSet) {
        let shoulder = frame.usable(Side::Left.shoulder());
        let elbow = frame.usable(Side::Left.elbow());
        let wrist = frame.usable(Side::Left.wrist());
        let hip = frame.usable(Side::Left.hip());

        if let (Some(s), Some(e), Some(w)) = (shoulder, elbow, wrist) {
            angles.set(AngleKey::ArmSwing, Some(interior_angle(s.xy(), e.xy(), w.xy())));
        }

        if let (Some(l), Some(r)) = (shoulder, frame.usable(Side::Right.shoulder())) {
            angles.set(
                AngleKey::ShoulderRotation,
                Some(angle_from_horizontal(l.xy(), r.xy())),
            );
        }

        if let (Some(s), Some(h)) = (shoulder, hip) {
            let raw = heading_from_vertical(h.xy() - s.xy()).abs();
            angles.set(AngleKey::TrunkLean, Some(self.trunk_lean.apply(raw)));
        }

        if view == View::Back {
            if let (Some(s), Some(h), Some(k)) = (shoulder, hip, frame.usable(Side::Left.knee())) {
                angles.set(AngleKey::HipExtension, Some(interior_angle(s.xy(), h.xy(), k.xy())));
            }
        }
    }

    fn compute_lateral(&self, frame: &Frame, view: View, angles: &mut AngleSet) {
        let side = match view.near_side() {
            Some(side) => side,
            None => return,
        };
        let shoulder = frame.usable(side.shoulder());
        let wrist = frame.usable(side.wrist());
        let hip = frame.usable(side.hip());

        if let (Some(s), Some(w), Some(_)) = (shoulder, wrist, hip) {
            let arm = w.xy() - s.xy();
            let angle = tilt_from_vertical(arm);
            // 進行方向側に手首があれば前振り
            if arm.x * view.forward_sign() > 0.0 {
                angles.set(AngleKey::FrontSwingAngle, Some(angle));
            } else {
                angles.set(AngleKey::BackSwingAngle, Some(angle));
            }
        }

        if let (Some(s), Some(h)) = (shoulder, hip) {
            angles.set(AngleKey::LateralTrunkLean, Some(tilt_from_vertical(h.xy() - s.xy())));
        }
    }
}

impl Default for AngleCalculator {
    fn default() -> Self {
        Self::new(TrunkLeanConvention::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Landmark, LandmarkIndex};

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn frame_with(points: &[(LandmarkIndex, (f64, f64))]) -> Frame {
        let mut landmarks = vec![Landmark::default(); LandmarkIndex::COUNT];
        for (idx, (x, y)) in points {
            landmarks[*idx as usize] = Landmark::new(*x, *y, 0.0, 0.9);
        }
        Frame::new(landmarks, 0)
    }

    #[test]
    fn test_arm_swing_right_angle_fixture() {
        let frame = frame_with(&[
            (LandmarkIndex::LeftShoulder, (0.0, 0.0)),
            (LandmarkIndex::LeftElbow, (0.0, 1.0)),
            (LandmarkIndex::LeftWrist, (1.0, 1.0)),
        ]);
        let angles = AngleCalculator::default().compute(&frame, View::Front);
        let arm = angles.get(AngleKey::ArmSwing).unwrap();
        assert!(approx_eq(arm, 90.0), "armSwing={}", arm);
    }

    #[test]
    fn test_arm_swing_stays_within_half_turn() {
        let frame = frame_with(&[
            (LandmarkIndex::LeftShoulder, (0.5, 0.2)),
            (LandmarkIndex::LeftElbow, (0.5, 0.4)),
            (LandmarkIndex::LeftWrist, (0.3, 0.3)),
        ]);
        let arm = AngleCalculator::default()
            .compute(&frame, View::Back)
            .get(AngleKey::ArmSwing)
            .unwrap();
        assert!((0.0..=180.0).contains(&arm));
    }

    #[test]
    fn test_missing_landmark_gives_none() {
        let frame = frame_with(&[
            (LandmarkIndex::LeftShoulder, (0.0, 0.0)),
            (LandmarkIndex::LeftElbow, (0.0, 1.0)),
        ]);
        let angles = AngleCalculator::default().compute(&frame, View::Front);
        assert_eq!(angles.get(AngleKey::ArmSwing), None);
        assert_eq!(angles.get(AngleKey::TrunkLean), None);
    }

    #[test]
    fn test_low_visibility_is_missing() {
        let mut frame = frame_with(&[
            (LandmarkIndex::LeftShoulder, (0.0, 0.0)),
            (LandmarkIndex::LeftElbow, (0.0, 1.0)),
            (LandmarkIndex::LeftWrist, (1.0, 1.0)),
        ]);
        frame.landmarks[LandmarkIndex::LeftWrist as usize].visibility = 0.3;
        let angles = AngleCalculator::default().compute(&frame, View::Front);
        assert_eq!(angles.get(AngleKey::ArmSwing), None);
    }

    #[test]
    fn test_shoulder_rotation_and_trunk_lean() {
        let frame = frame_with(&[
            (LandmarkIndex::LeftShoulder, (0.4, 0.3)),
            (LandmarkIndex::RightShoulder, (0.6, 0.3)),
            (LandmarkIndex::LeftHip, (0.4, 0.6)),
        ]);
        let angles = AngleCalculator::default().compute(&frame, View::Front);
        assert!(approx_eq(angles.get(AngleKey::ShoulderRotation).unwrap(), 0.0));
        assert!(approx_eq(angles.get(AngleKey::TrunkLean).unwrap(), 0.0));

        let inverted = AngleCalculator::new(TrunkLeanConvention::Inverted).compute(&frame, View::Front);
        assert!(approx_eq(inverted.get(AngleKey::TrunkLean).unwrap(), 180.0));
    }

    #[test]
    fn test_hip_extension_back_view_only() {
        let frame = frame_with(&[
            (LandmarkIndex::LeftShoulder, (0.5, 0.2)),
            (LandmarkIndex::LeftHip, (0.5, 0.5)),
            (LandmarkIndex::LeftKnee, (0.6, 0.7)),
        ]);
        let calc = AngleCalculator::default();
        assert_eq!(calc.compute(&frame, View::Front).get(AngleKey::HipExtension), None);
        let hip = calc.compute(&frame, View::Back).get(AngleKey::HipExtension).unwrap();
        assert!(hip > 150.0 && hip < 180.0, "hipExtension={}", hip);
    }

    #[test]
    fn test_lateral_swing_bucket_flips_with_view() {
        // 左手首が肩より画面左にある
        let left = frame_with(&[
            (LandmarkIndex::LeftShoulder, (0.5, 0.3)),
            (LandmarkIndex::LeftWrist, (0.4, 0.5)),
            (LandmarkIndex::LeftHip, (0.5, 0.6)),
        ]);
        let calc = AngleCalculator::default();
        let angles = calc.compute(&left, View::Left);
        assert!(angles.get(AngleKey::FrontSwingAngle).is_some());
        assert_eq!(angles.get(AngleKey::BackSwingAngle), None);

        // 右ビューでは同じ配置が後ろ振り
        let right = frame_with(&[
            (LandmarkIndex::RightShoulder, (0.5, 0.3)),
            (LandmarkIndex::RightWrist, (0.4, 0.5)),
            (LandmarkIndex::RightHip, (0.5, 0.6)),
        ]);
        let angles = calc.compute(&right, View::Right);
        assert!(angles.get(AngleKey::BackSwingAngle).is_some());
        assert_eq!(angles.get(AngleKey::FrontSwingAngle), None);
        assert_eq!(angles.get(AngleKey::ArmSwing), None);
    }

    #[test]
    fn test_lateral_trunk_lean() {
        let frame = frame_with(&[
            (LandmarkIndex::LeftShoulder, (0.45, 0.3)),
            (LandmarkIndex::LeftHip, (0.5, 0.6)),
        ]);
        let lean = AngleCalculator::default()
            .compute(&frame, View::Left)
            .get(AngleKey::LateralTrunkLean)
            .unwrap();
        let expected = (0.05f64).atan2(0.3).to_degrees();
        assert!(approx_eq(lean, expected));
    }

    #[test]
    fn test_angle_set_serializes_as_map() {
        let mut set = AngleSet::default();
        set.set(AngleKey::TrunkLean, Some(7.5));
        let json = serde_json::to_value(set).unwrap();
        assert_eq!(json["trunkLean"], 7.5);
        assert!(json["armSwing"].is_null());

        let back: AngleSet = serde_json::from_value(json).unwrap();
        assert_eq!(back, set);
    }
}
