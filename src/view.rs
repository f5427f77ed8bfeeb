//! Viewing configurations and the sign conventions that depend on them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GaitError;
use crate::pose::{LandmarkIndex, Side};

/// Camera placement relative to the walker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Front,
    Back,
    Left,
    Right,
}

impl View {
    pub const ALL: [View; 4] = [View::Front, View::Back, View::Left, View::Right];

    /// 側面ビュー（左右）か
    pub fn is_lateral(self) -> bool {
        matches!(self, View::Left | View::Right)
    }

    /// Sign along this view's forward cue axis that means "direction of travel".
    ///
    /// Lateral views use screen x (left: -1, right: +1). Frontal views use
    /// depth z relative to the shoulder (front: -1, nearer the camera is
    /// forward; back: +1).
    pub fn forward_sign(self) -> f64 {
        match self {
            View::Left | View::Front => -1.0,
            View::Right | View::Back => 1.0,
        }
    }

    /// Screen-x sign pointing away from the body midline for `side` in frontal
    /// views. The walker's left appears on the image right when facing the
    /// camera. Lateral views have no outward screen axis and return 0.
    pub fn outward_sign(self, side: Side) -> f64 {
        match (self, side) {
            (View::Front, Side::Left) | (View::Back, Side::Right) => 1.0,
            (View::Front, Side::Right) | (View::Back, Side::Left) => -1.0,
            (View::Left, _) | (View::Right, _) => 0.0,
        }
    }

    /// The arm facing the camera in lateral views.
    pub fn near_side(self) -> Option<Side> {
        match self {
            View::Left => Some(Side::Left),
            View::Right => Some(Side::Right),
            View::Front | View::Back => None,
        }
    }

    pub fn config(self) -> &'static ViewConfig {
        match self {
            View::Front => &FRONT,
            View::Back => &BACK,
            View::Left => &LEFT,
            View::Right => &RIGHT,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            View::Front => "front",
            View::Back => "back",
            View::Left => "left",
            View::Right => "right",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for View {
    type Err = GaitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "front" => Ok(View::Front),
            "back" => Ok(View::Back),
            "left" => Ok(View::Left),
            "right" => Ok(View::Right),
            other => Err(GaitError::InvalidConfig {
                field: "view",
                reason: format!("unknown view `{}`", other),
            }),
        }
    }
}

/// Every angle the calculator knows about, across all views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(usize)]
pub enum AngleKey {
    ArmSwing = 0,
    ShoulderRotation = 1,
    TrunkLean = 2,
    HipExtension = 3,
    FrontSwingAngle = 4,
    BackSwingAngle = 5,
    LateralTrunkLean = 6,
}

impl AngleKey {
    pub const COUNT: usize = 7;

    pub const ALL: [AngleKey; Self::COUNT] = [
        AngleKey::ArmSwing,
        AngleKey::ShoulderRotation,
        AngleKey::TrunkLean,
        AngleKey::HipExtension,
        AngleKey::FrontSwingAngle,
        AngleKey::BackSwingAngle,
        AngleKey::LateralTrunkLean,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AngleKey::ArmSwing => "armSwing",
            AngleKey::ShoulderRotation => "shoulderRotation",
            AngleKey::TrunkLean => "trunkLean",
            AngleKey::HipExtension => "hipExtension",
            AngleKey::FrontSwingAngle => "frontSwingAngle",
            AngleKey::BackSwingAngle => "backSwingAngle",
            AngleKey::LateralTrunkLean => "lateralTrunkLean",
        }
    }
}

/// Healthy range `[min, max]` in degrees.
pub type AngleRange = (f64, f64);

/// Recommended pole angle from vertical at ground contact.
pub const POLE_ANGLE_RANGE: AngleRange = (30.0, 50.0);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleDef {
    pub key: AngleKey,
    pub label: &'static str,
    pub range: AngleRange,
}

/// Angles reported and skeleton edges drawn for one view.
#[derive(Debug)]
pub struct ViewConfig {
    pub view: View,
    pub angles: &'static [AngleDef],
    pub connections: &'static [(LandmarkIndex, LandmarkIndex)],
}

impl ViewConfig {
    pub fn contains(&self, key: AngleKey) -> bool {
        self.angles.iter().any(|def| def.key == key)
    }
}

use LandmarkIndex::*;

const FRONTAL_CONNECTIONS: [(LandmarkIndex, LandmarkIndex); 12] = [
    // 上半身
    (LeftShoulder, RightShoulder),
    (LeftShoulder, LeftElbow),
    (LeftElbow, LeftWrist),
    (RightShoulder, RightElbow),
    (RightElbow, RightWrist),
    // 胴体
    (LeftShoulder, LeftHip),
    (RightShoulder, RightHip),
    (LeftHip, RightHip),
    // 下半身
    (LeftHip, LeftKnee),
    (RightHip, RightKnee),
    (LeftKnee, LeftAnkle),
    (RightKnee, RightAnkle),
];

// Shoulders overlap from the side, so the shoulder bar is not drawn.
const LATERAL_CONNECTIONS: [(LandmarkIndex, LandmarkIndex); 11] = [
    (LeftShoulder, LeftElbow),
    (LeftElbow, LeftWrist),
    (RightShoulder, RightElbow),
    (RightElbow, RightWrist),
    (LeftShoulder, LeftHip),
    (RightShoulder, RightHip),
    (LeftHip, RightHip),
    (LeftHip, LeftKnee),
    (LeftKnee, LeftAnkle),
    (RightHip, RightKnee),
    (RightKnee, RightAnkle),
];

const ARM_SWING: AngleDef = AngleDef {
    key: AngleKey::ArmSwing,
    label: "Arm swing",
    range: (60.0, 90.0),
};

const SHOULDER_ROTATION: AngleDef = AngleDef {
    key: AngleKey::ShoulderRotation,
    label: "Shoulder rotation",
    range: (30.0, 45.0),
};

const LATERAL_ANGLES: [AngleDef; 3] = [
    AngleDef {
        key: AngleKey::FrontSwingAngle,
        label: "Front swing angle",
        range: (45.0, 75.0),
    },
    AngleDef {
        key: AngleKey::BackSwingAngle,
        label: "Back swing angle",
        range: (45.0, 75.0),
    },
    AngleDef {
        key: AngleKey::LateralTrunkLean,
        label: "Lateral trunk lean",
        range: (5.0, 15.0),
    },
];

static FRONT: ViewConfig = ViewConfig {
    view: View::Front,
    angles: &[
        ARM_SWING,
        SHOULDER_ROTATION,
        AngleDef {
            key: AngleKey::TrunkLean,
            label: "Trunk lean",
            range: (5.0, 15.0),
        },
    ],
    connections: &FRONTAL_CONNECTIONS,
};

static BACK: ViewConfig = ViewConfig {
    view: View::Back,
    angles: &[
        ARM_SWING,
        SHOULDER_ROTATION,
        AngleDef {
            key: AngleKey::HipExtension,
            label: "Hip extension",
            range: (25.0, 40.0),
        },
    ],
    connections: &FRONTAL_CONNECTIONS,
};

static LEFT: ViewConfig = ViewConfig {
    view: View::Left,
    angles: &LATERAL_ANGLES,
    connections: &LATERAL_CONNECTIONS,
};

static RIGHT: ViewConfig = ViewConfig {
    view: View::Right,
    angles: &LATERAL_ANGLES,
    connections: &LATERAL_CONNECTIONS,
};

/// How far a measured angle sits from its healthy range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AngleStatus {
    Good,
    Warning,
    Error,
}

impl AngleStatus {
    /// Good inside the range, Warning within 20% of the range width outside it.
    pub fn classify(value: f64, range: AngleRange) -> Self {
        let (min, max) = range;
        let tolerance = (max - min) * 0.2;
        if value >= min && value <= max {
            AngleStatus::Good
        } else if value >= min - tolerance && value <= max + tolerance {
            AngleStatus::Warning
        } else {
            AngleStatus::Error
        }
    }
}
