use tracing::debug;

use crate::config::AnalysisConfig;
use crate::pose::{Frame, Side};
use crate::stats::MetricSeries;
use crate::view::View;

/// 統計に採用する歩幅の範囲（cm、両端を含まない）
pub const STRIDE_BAND_CM: (f64, f64) = (20.0, 150.0);

/// 側面ビューでの足首間の水平距離から歩幅を推定
pub struct StrideEstimator {
    frame_width: f64,
    pixels_per_cm: f64,
}

impl StrideEstimator {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            frame_width: config.frame_width as f64,
            pixels_per_cm: config.pixels_per_cm,
        }
    }

    /// Raw ankle separation in centimetres, lateral views only.
    pub fn measure(&self, frame: &Frame, view: View) -> Option<f64> {
        if !view.is_lateral() {
            return None;
        }
        let left = frame.usable(Side::Left.ankle())?;
        let right = frame.usable(Side::Right.ankle())?;
        let pixels = (left.x - right.x).abs() * self.frame_width;
        Some(pixels / self.pixels_per_cm)
    }

    /// Measures and folds into `series`. Out-of-band values only move
    /// `current`.
    pub fn update(&self, frame: &Frame, view: View, series: &mut MetricSeries) -> Option<f64> {
        let cm = self.measure(frame, view)?;
        if is_plausible(cm) {
            series.record(Some(cm));
        } else {
            debug!("stride {:.1}cm outside plausible band, display only", cm);
            series.set_current(cm);
        }
        Some(cm)
    }
}

pub fn is_plausible(cm: f64) -> bool {
    cm > STRIDE_BAND_CM.0 && cm < STRIDE_BAND_CM.1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Landmark, LandmarkIndex};

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    /// 1280px / 5px/cm の既定設定で、指定cmだけ離れた足首
    fn ankles_apart(cm: f64) -> Frame {
        let dx = cm * 5.0 / 1280.0;
        let mut landmarks = vec![Landmark::default(); LandmarkIndex::COUNT];
        landmarks[LandmarkIndex::LeftAnkle as usize] = Landmark::new(0.1, 0.9, 0.0, 1.0);
        landmarks[LandmarkIndex::RightAnkle as usize] = Landmark::new(0.1 + dx, 0.9, 0.0, 1.0);
        Frame::new(landmarks, 0)
    }

    #[test]
    fn test_plausible_stride_updates_everything() {
        let estimator = StrideEstimator::from_config(&AnalysisConfig::default());
        let mut series = MetricSeries::new();
        let cm = estimator.update(&ankles_apart(80.0), View::Left, &mut series).unwrap();
        assert!(approx_eq(cm, 80.0));
        assert!(approx_eq(series.current, 80.0));
        assert!(approx_eq(series.max, 80.0));
        assert!(approx_eq(series.min, 80.0));
        assert!(approx_eq(series.average, 80.0));
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn test_outlier_only_moves_current() {
        let estimator = StrideEstimator::from_config(&AnalysisConfig::default());
        let mut series = MetricSeries::new();
        estimator.update(&ankles_apart(80.0), View::Right, &mut series);
        estimator.update(&ankles_apart(300.0), View::Right, &mut series);
        assert!(approx_eq(series.current, 300.0));
        assert!(approx_eq(series.max, 80.0));
        assert!(approx_eq(series.min, 80.0));
        assert!(approx_eq(series.average, 80.0));
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn test_band_is_exclusive() {
        assert!(!is_plausible(20.0));
        assert!(!is_plausible(150.0));
        assert!(is_plausible(20.5));
    }

    #[test]
    fn test_frontal_view_has_no_stride() {
        let estimator = StrideEstimator::from_config(&AnalysisConfig::default());
        assert!(estimator.measure(&ankles_apart(80.0), View::Front).is_none());
    }

    #[test]
    fn test_missing_ankle() {
        let estimator = StrideEstimator::from_config(&AnalysisConfig::default());
        let mut frame = ankles_apart(80.0);
        frame.landmarks[LandmarkIndex::RightAnkle as usize].visibility = 0.2;
        assert!(estimator.measure(&frame, View::Left).is_none());
    }
}
