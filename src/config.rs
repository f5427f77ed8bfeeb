use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::GaitError;
use crate::tracker::{GripPoint, PoleModel, TrunkLeanConvention};
use crate::view::View;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    /// 起動時のビュー (front / back / left / right)
    #[serde(default)]
    pub view: View,
    /// キャリブレーション定数（ピクセル/cm）
    #[serde(default = "default_pixels_per_cm")]
    pub pixels_per_cm: f64,
    /// フレーム幅（ピクセル）
    #[serde(default = "default_frame_width")]
    pub frame_width: u32,
    /// フレーム高さ（ピクセル）
    #[serde(default = "default_frame_height")]
    pub frame_height: u32,
    /// ポール先端の推定方式
    #[serde(default)]
    pub pole_model: PoleModel,
    /// グリップ位置の取り方
    #[serde(default)]
    pub grip_point: GripPoint,
    /// 体幹前傾の符号規約
    #[serde(default)]
    pub trunk_lean: TrunkLeanConvention,
}

fn default_pixels_per_cm() -> f64 { 5.0 }
fn default_frame_width() -> u32 { 1280 }
fn default_frame_height() -> u32 { 720 }

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            view: View::default(),
            pixels_per_cm: default_pixels_per_cm(),
            frame_width: default_frame_width(),
            frame_height: default_frame_height(),
            pole_model: PoleModel::default(),
            grip_point: GripPoint::default(),
            trunk_lean: TrunkLeanConvention::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), GaitError> {
        if !self.pixels_per_cm.is_finite() || self.pixels_per_cm <= 0.0 {
            return Err(GaitError::InvalidConfig {
                field: "pixels_per_cm",
                reason: format!("must be a positive finite number, got {}", self.pixels_per_cm),
            });
        }
        if self.frame_width == 0 {
            return Err(GaitError::InvalidConfig {
                field: "frame_width",
                reason: "must be non-zero".to_string(),
            });
        }
        if self.frame_height == 0 {
            return Err(GaitError::InvalidConfig {
                field: "frame_height",
                reason: "must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// 待ち受けアドレス
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

fn default_listen_addr() -> String { "0.0.0.0:9100".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    /// tracing のフィルタ指定 (RUST_LOG が優先)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String { "info".to_string() }

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    /// ファイルが無ければデフォルト設定
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), GaitError> {
        self.analysis.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.analysis.view, View::Front);
        assert_eq!(config.analysis.pixels_per_cm, 5.0);
        assert_eq!(config.analysis.frame_width, 1280);
        assert_eq!(config.analysis.pole_model, PoleModel::GroundLine);
        assert_eq!(config.analysis.grip_point, GripPoint::Wrist);
        assert_eq!(config.analysis.trunk_lean, TrunkLeanConvention::Raw);
        assert_eq!(config.server.listen_addr, "0.0.0.0:9100");
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_parse_partial() {
        let config = Config::parse(
            r#"
            [analysis]
            view = "left"
            pixels_per_cm = 4.0
            pole_model = "forearm_offset"
            "#,
        )
        .unwrap();
        assert_eq!(config.analysis.view, View::Left);
        assert_eq!(config.analysis.pixels_per_cm, 4.0);
        assert_eq!(config.analysis.pole_model, PoleModel::ForearmOffset);
        assert_eq!(config.analysis.frame_height, 720);
    }

    #[test]
    fn test_empty_file_is_default() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.analysis.frame_width, 1280);
    }

    #[test]
    fn test_rejects_bad_calibration() {
        let err = Config::parse("[analysis]\npixels_per_cm = 0.0\n").unwrap_err();
        let gait = err.downcast_ref::<GaitError>().unwrap();
        assert!(matches!(
            gait,
            GaitError::InvalidConfig { field: "pixels_per_cm", .. }
        ));
    }

    #[test]
    fn test_rejects_zero_width() {
        let mut analysis = AnalysisConfig::default();
        analysis.frame_width = 0;
        assert!(analysis.validate().is_err());
    }

    #[test]
    fn test_rejects_unknown_view() {
        assert!(Config::parse("[analysis]\nview = \"diagonal\"\n").is_err());
    }
}
