use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::error::GaitError;

/// 可視性の閾値。これを超えたランドマークのみ使用する
pub const VISIBILITY_THRESHOLD: f64 = 0.5;

/// Nominal playback rate used to derive frame indices from media time.
pub const NOMINAL_FPS: f64 = 30.0;

/// Values per landmark in a flat frame buffer (x, y, z, visibility).
pub const VALUES_PER_LANDMARK: usize = 4;

/// 33点ボディトポロジーのランドマークインデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum LandmarkIndex {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl LandmarkIndex {
    pub const COUNT: usize = 33;
}

/// Body side of a paired landmark or limb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    pub fn shoulder(self) -> LandmarkIndex {
        self.pick(LandmarkIndex::LeftShoulder, LandmarkIndex::RightShoulder)
    }

    pub fn elbow(self) -> LandmarkIndex {
        self.pick(LandmarkIndex::LeftElbow, LandmarkIndex::RightElbow)
    }

    pub fn wrist(self) -> LandmarkIndex {
        self.pick(LandmarkIndex::LeftWrist, LandmarkIndex::RightWrist)
    }

    pub fn pinky(self) -> LandmarkIndex {
        self.pick(LandmarkIndex::LeftPinky, LandmarkIndex::RightPinky)
    }

    pub fn index_finger(self) -> LandmarkIndex {
        self.pick(LandmarkIndex::LeftIndex, LandmarkIndex::RightIndex)
    }

    pub fn thumb(self) -> LandmarkIndex {
        self.pick(LandmarkIndex::LeftThumb, LandmarkIndex::RightThumb)
    }

    pub fn hip(self) -> LandmarkIndex {
        self.pick(LandmarkIndex::LeftHip, LandmarkIndex::RightHip)
    }

    pub fn knee(self) -> LandmarkIndex {
        self.pick(LandmarkIndex::LeftKnee, LandmarkIndex::RightKnee)
    }

    pub fn ankle(self) -> LandmarkIndex {
        self.pick(LandmarkIndex::LeftAnkle, LandmarkIndex::RightAnkle)
    }

    fn pick(self, left: LandmarkIndex, right: LandmarkIndex) -> LandmarkIndex {
        match self {
            Side::Left => left,
            Side::Right => right,
        }
    }
}

/// 単一ランドマーク
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// 正規化されたX座標 (0.0〜1.0)
    pub x: f64,
    /// 正規化されたY座標 (0.0〜1.0、下が正)
    pub y: f64,
    /// 相対深度（カメラに近いほど負）
    #[serde(default)]
    pub z: f64,
    /// 可視性スコア (0.0〜1.0)
    pub visibility: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64, visibility: f64) -> Self {
        Self { x, y, z, visibility }
    }

    /// 可視性が閾値を超えているか
    pub fn is_usable(&self) -> bool {
        self.visibility > VISIBILITY_THRESHOLD
    }

    /// 画像平面上の位置
    pub fn xy(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }
}

impl Default for Landmark {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            visibility: 0.0,
        }
    }
}

/// One sampled instant from the pose estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Indexed by anatomical landmark id; shorter buffers treat the tail as absent.
    pub landmarks: Vec<Landmark>,
    /// Capture time in milliseconds, drives the CoM trail window.
    pub timestamp_ms: u64,
    /// Playback position in seconds for media sources; `None` for live capture.
    #[serde(default)]
    pub media_time: Option<f64>,
}

impl Frame {
    pub fn new(landmarks: Vec<Landmark>, timestamp_ms: u64) -> Self {
        Self {
            landmarks,
            timestamp_ms,
            media_time: None,
        }
    }

    pub fn with_media_time(mut self, seconds: f64) -> Self {
        self.media_time = Some(seconds);
        self
    }

    /// Build a frame from a flat `[x, y, z, visibility] * 33` buffer.
    pub fn from_flat(data: &[f64], timestamp_ms: u64) -> Result<Self, GaitError> {
        let expected = LandmarkIndex::COUNT * VALUES_PER_LANDMARK;
        if data.len() != expected {
            return Err(GaitError::InvalidFrameLength {
                expected,
                actual: data.len(),
            });
        }
        let landmarks = data
            .chunks_exact(VALUES_PER_LANDMARK)
            .map(|c| Landmark::new(c[0], c[1], c[2], c[3]))
            .collect();
        Ok(Self::new(landmarks, timestamp_ms))
    }

    /// Raw landmark regardless of visibility.
    pub fn get(&self, index: LandmarkIndex) -> Option<&Landmark> {
        self.landmarks.get(index as usize)
    }

    /// Landmark only if it passes the visibility threshold.
    pub fn usable(&self, index: LandmarkIndex) -> Option<&Landmark> {
        self.get(index).filter(|lm| lm.is_usable())
    }

    /// Frame index derived from media time at the nominal rate.
    pub fn frame_index(&self) -> Option<u64> {
        self.media_time
            .filter(|t| t.is_finite() && *t >= 0.0)
            .map(|t| (t * NOMINAL_FPS).floor() as u64)
    }

    /// Whether the estimator supplied any depth signal for usable landmarks.
    pub fn has_depth(&self) -> bool {
        self.landmarks
            .iter()
            .any(|lm| lm.is_usable() && lm.z != 0.0)
    }
}
