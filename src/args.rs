// 该文件是 Gamji （감지） 项目的一部分。
// src/args.rs - 项目参数配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use clap::Parser;
use gamji::{
  model::{DetectorConfig, SuppressionMode},
  process::ProcessorConfig,
};
use url::Url;

/// Gamji 实时检测参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型文件路径，在开启检测时加载
  #[arg(long, default_value = "assets/yolov8s.onnx", value_name = "FILE")]
  pub model: PathBuf,

  /// 输入来源，例如 image:///path/to/frame.png?fps=30
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 输出路径
  /// 支持格式:
  /// - log:                               仅写日志
  /// - image:///out.png                   保存图片
  /// - folder:///dir?record=name&always   按日期目录记录
  /// - video:///out.mp4?fps=30            保存视频
  #[arg(long, default_value = "log:", value_name = "OUTPUT")]
  pub output: Url,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.25", value_name = "THRESHOLD")]
  pub confidence: f32,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.45", value_name = "THRESHOLD")]
  pub iou_threshold: f32,

  /// 模型输入边长，模型声明固定尺寸时以模型为准
  #[arg(long, default_value = "640", value_name = "PIXELS")]
  pub input_size: u32,

  /// 抑制方式: agnostic 或 per-class
  #[arg(long, default_value = "agnostic", value_name = "MODE")]
  pub suppression: SuppressionMode,

  /// 推理线程数
  #[arg(long, default_value = "4", value_name = "COUNT")]
  pub threads: usize,

  /// 启动时开启检测
  #[arg(long)]
  pub detect: bool,

  /// 对比度增益
  #[arg(long, default_value = "1.0")]
  pub alpha: f64,

  /// 亮度偏移
  #[arg(long, default_value = "0.0", allow_negative_numbers = true)]
  pub beta: f64,

  /// 水平翻转
  #[arg(long)]
  pub flip_h: bool,

  /// 垂直翻转
  #[arg(long)]
  pub flip_v: bool,

  /// 灰度
  #[arg(long)]
  pub gray: bool,

  /// 红色掩膜
  #[arg(long)]
  pub red_mask: bool,

  /// 均值模糊
  #[arg(long)]
  pub blur: bool,

  /// 高斯模糊
  #[arg(long)]
  pub gaussian: bool,

  /// 模糊核大小（奇数，最小 3）
  #[arg(long, default_value = "5")]
  pub kernel: u32,

  /// 高斯标准差
  #[arg(long, default_value = "1.2")]
  pub sigma: f64,

  /// 中心放大倍数
  #[arg(long, default_value = "1")]
  pub zoom: u32,

  /// 刷新间隔（毫秒）
  #[arg(long, default_value = "100", value_name = "MS")]
  pub tick_ms: u64,

  /// 最大处理帧数，不指定表示无限制
  #[arg(long, value_name = "COUNT")]
  pub max_frames: Option<usize>,

  /// 快照保存目录
  #[arg(long, default_value = ".", value_name = "DIR")]
  pub snapshot_dir: PathBuf,

  /// 录像保存目录
  #[arg(long, default_value = ".", value_name = "DIR")]
  pub record_dir: PathBuf,

  /// 不从标准输入读取操作命令
  #[arg(long)]
  pub no_console: bool,
}

impl Args {
  pub fn detector_config(&self) -> DetectorConfig {
    DetectorConfig::default()
      .with_input_size(self.input_size)
      .with_confidence_threshold(self.confidence)
      .with_iou_threshold(self.iou_threshold)
      .with_suppression(self.suppression)
  }

  pub fn processor_config(&self) -> ProcessorConfig {
    let mut config = ProcessorConfig::default()
      .with_kernel_size(self.kernel)
      .with_sigma(self.sigma)
      .with_zoom(self.zoom);
    config.alpha = self.alpha;
    config.beta = self.beta;
    config.flip_horizontal = self.flip_h;
    config.flip_vertical = self.flip_v;
    config.gray = self.gray;
    config.red_mask = self.red_mask;
    config.box_blur = self.blur;
    config.gaussian_blur = self.gaussian;
    config
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_match_detector_defaults() {
    let args = Args::parse_from(["gamji", "--input", "image:///tmp/a.png"]);
    assert_eq!(args.detector_config(), DetectorConfig::default());
    assert!(args.processor_config().is_identity());
    assert_eq!(args.model, PathBuf::from("assets/yolov8s.onnx"));
  }

  #[test]
  fn processor_flags_are_applied() {
    let args = Args::parse_from([
      "gamji",
      "--input",
      "image:///tmp/a.png",
      "--gray",
      "--kernel",
      "4",
      "--beta",
      "-20",
      "--suppression",
      "per-class",
    ]);
    let config = args.processor_config();
    assert!(config.gray);
    assert_eq!(config.kernel_size(), 5);
    assert_eq!(config.beta, -20.0);
    assert_eq!(args.suppression, SuppressionMode::PerClass);
  }
}
