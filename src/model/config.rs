// 该文件是 Gamji （감지） 项目的一部分。
// src/model/config.rs - 检测器配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::str::FromStr;

use thiserror::Error;

const DEFAULT_INPUT_SIZE: u32 = 640;
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;
const DEFAULT_IOU_THRESHOLD: f32 = 0.45;
const DEFAULT_NUM_CLASSES: usize = 80;

/// 每个候选框除类别分数外的通道数：cx, cy, w, h, objectness
pub const BOX_CHANNELS: usize = 5;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
  #[error("{name} 超出有效范围 [0, 1]: {value}")]
  ThresholdOutOfRange { name: &'static str, value: f32 },
  #[error("输入尺寸必须大于 0")]
  ZeroInputSize,
  #[error("类别数量必须大于 0")]
  ZeroClasses,
  #[error("未知的抑制模式: {0}")]
  UnknownSuppressionMode(String),
}

/// 非极大值抑制的比较范围
///
/// 默认与模型族的约定一致：只比较框的重叠，不看类别。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SuppressionMode {
  #[default]
  ClassAgnostic,
  /// 只抑制同类别的重叠框
  PerClass,
}

impl FromStr for SuppressionMode {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "agnostic" | "class-agnostic" => Ok(SuppressionMode::ClassAgnostic),
      "per-class" | "class-aware" => Ok(SuppressionMode::PerClass),
      other => Err(ConfigError::UnknownSuppressionMode(other.to_string())),
    }
  }
}

/// 单次推理期间不可变的检测配置
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
  /// 模型正方形输入边长
  pub input_size: u32,
  /// 置信度阈值
  pub confidence_threshold: f32,
  /// NMS IOU 阈值
  pub iou_threshold: f32,
  /// 类别数量
  pub num_classes: usize,
  pub suppression: SuppressionMode,
}

impl Default for DetectorConfig {
  fn default() -> Self {
    Self {
      input_size: DEFAULT_INPUT_SIZE,
      confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
      iou_threshold: DEFAULT_IOU_THRESHOLD,
      num_classes: DEFAULT_NUM_CLASSES,
      suppression: SuppressionMode::default(),
    }
  }
}

impl DetectorConfig {
  pub fn with_input_size(mut self, input_size: u32) -> Self {
    self.input_size = input_size;
    self
  }

  pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
    self.confidence_threshold = threshold;
    self
  }

  pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
    self.iou_threshold = threshold;
    self
  }

  pub fn with_suppression(mut self, suppression: SuppressionMode) -> Self {
    self.suppression = suppression;
    self
  }

  /// 每个候选框的通道数 C = 5 + 类别数
  pub fn channels(&self) -> usize {
    BOX_CHANNELS + self.num_classes
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    for (name, value) in [
      ("置信度阈值", self.confidence_threshold),
      ("IOU 阈值", self.iou_threshold),
    ] {
      if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::ThresholdOutOfRange { name, value });
      }
    }
    if self.input_size == 0 {
      return Err(ConfigError::ZeroInputSize);
    }
    if self.num_classes == 0 {
      return Err(ConfigError::ZeroClasses);
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_match_bundled_model() {
    let config = DetectorConfig::default();
    assert_eq!(config.input_size, 640);
    assert_eq!(config.confidence_threshold, 0.25);
    assert_eq!(config.iou_threshold, 0.45);
    assert_eq!(config.channels(), 85);
    assert_eq!(config.suppression, SuppressionMode::ClassAgnostic);
    assert!(config.validate().is_ok());
  }

  #[test]
  fn validate_rejects_bad_values() {
    let config = DetectorConfig::default().with_confidence_threshold(1.5);
    assert!(matches!(
      config.validate(),
      Err(ConfigError::ThresholdOutOfRange { value, .. }) if value == 1.5
    ));
    assert_eq!(
      DetectorConfig::default().with_input_size(0).validate(),
      Err(ConfigError::ZeroInputSize)
    );
    assert!(
      DetectorConfig::default()
        .with_iou_threshold(f32::NAN)
        .validate()
        .is_err()
    );
  }

  #[test]
  fn suppression_mode_from_str() {
    assert_eq!(
      "per-class".parse::<SuppressionMode>(),
      Ok(SuppressionMode::PerClass)
    );
    assert_eq!(
      "agnostic".parse::<SuppressionMode>(),
      Ok(SuppressionMode::ClassAgnostic)
    );
    assert!("greedy".parse::<SuppressionMode>().is_err());
  }
}
