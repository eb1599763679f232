// 该文件是 Gamji （감지） 项目的一部分。
// src/output/snapshot.rs - 快照保存
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::info;

use crate::frame::BgrFrame;

#[derive(Error, Debug)]
pub enum SnapshotError {
  #[error("没有可保存的帧")]
  EmptyFrame,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
}

/// `snap_YYYYMMDD_HHMMSS.png`
pub fn snapshot_path(directory: &Path, now: DateTime<Local>) -> PathBuf {
  directory.join(format!("snap_{}.png", now.format("%Y%m%d_%H%M%S")))
}

/// 保存未经处理的原始帧
pub fn save_snapshot(directory: &Path, frame: &BgrFrame) -> Result<PathBuf, SnapshotError> {
  if frame.is_empty() {
    return Err(SnapshotError::EmptyFrame);
  }

  std::fs::create_dir_all(directory)?;
  let path = snapshot_path(directory, Local::now());
  frame.to_rgb_image().save(&path)?;

  info!("快照已保存: {}", path.display());
  Ok(path)
}
