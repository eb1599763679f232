// 该文件是 Gamji （감지） 项目的一部分。
// src/bin/simple_oneshot.rs - 单帧推理
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use url::Url;

use gamji::{
  FromUrl,
  input::ImageFileInput,
  model::{DetectionSession, DetectorConfig, OnnxModelBuilder},
  output::OutputWrapper,
  task::{OneShotTask, Task},
};
use tracing::info;

/// 单帧推理参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型文件路径
  #[arg(long, default_value = "assets/yolov8s.onnx", value_name = "MODEL")]
  pub model: PathBuf,
  /// 输入来源
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
  /// 置信度阈值
  #[arg(long, default_value = "0.25")]
  pub confidence: f32,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model.display());
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let input = ImageFileInput::from_url(&args.input)?;
  let config = DetectorConfig::default().with_confidence_threshold(args.confidence);
  let session = DetectionSession::new(OnnxModelBuilder::new(&args.model), config)?;
  let output = OutputWrapper::from_url(&args.output)?;

  OneShotTask::default().run_task(input, session, output)
}
