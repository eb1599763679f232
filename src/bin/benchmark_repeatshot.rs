// 该文件是 Gamji （감지） 项目的一部分。
// src/bin/benchmark_repeatshot.rs - 重复推理性能测试
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
  task::{RepeatShotTask, Task},
};

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
  #[arg(long, default_value = "log:", value_name = "OUTPUT")]
  pub output: Url,
  /// 重复次数
  #[arg(long, default_value = "100")]
  pub repeat: usize,
  /// 推理线程数
  #[arg(long, default_value = "4")]
  pub threads: usize,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  let input = ImageFileInput::from_url(&args.input)?;
  let loader = OnnxModelBuilder::new(&args.model).intra_threads(args.threads);
  let session = DetectionSession::new(loader, DetectorConfig::default())?;
  let output = OutputWrapper::from_url(&args.output)?;

  RepeatShotTask::default()
    .with_repeat(args.repeat)
    .run_task(input, session, output)
}
