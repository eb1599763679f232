// 该文件是 Gamji （감지） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod args;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use gamji::{
  FromUrl, console,
  input::ImageFileInput,
  model::{DetectionSession, OnnxModelBuilder},
  output::OutputWrapper,
  process::FrameProcessor,
  task::{LiveTask, Task},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("Gamji 实时检测");
  info!("模型文件路径: {}", args.model.display());
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);
  info!(
    "置信度阈值: {}, NMS 阈值: {}",
    args.confidence, args.iou_threshold
  );

  let loader = OnnxModelBuilder::new(&args.model)
    .input_size(args.input_size)
    .intra_threads(args.threads);
  let session = DetectionSession::new(loader, args.detector_config())?;

  let input = ImageFileInput::from_url(&args.input)?;
  let output = OutputWrapper::from_url(&args.output)?;

  let mut task = LiveTask::default()
    .with_processor(FrameProcessor::new(args.processor_config()))
    .with_tick(Duration::from_millis(args.tick_ms))
    .with_frame_limit(args.max_frames)
    .with_snapshot_dir(&args.snapshot_dir)
    .with_record_dir(&args.record_dir)
    .with_detect_on_start(args.detect);

  if !args.no_console {
    info!("操作命令: {}", console::OperatorCommand::HELP);
    task = task.with_commands(console::spawn_reader(std::io::stdin()));
  }

  task.run_task(input, session, output)
}
