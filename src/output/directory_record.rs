// 该文件是 Gamji （감지） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{
  path::{Path, PathBuf},
  sync::atomic::{AtomicU16, Ordering},
};

use chrono::{Datelike, Local};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::BgrFrame,
  model::DetectResult,
  output::{
    Render,
    draw::{Draw, DrawError},
  },
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("绘制错误: {0}")]
  DrawError(#[from] DrawError),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 每帧保存的内容
pub enum RecordMode {
  /// 保存叠加了检测框的图像
  Draw(Box<Draw>),
  /// 保存原始图像，检测结果写入同名 JSON 文件
  Record { label_with_name: bool },
}

impl RecordMode {
  fn save_result(
    &self,
    path: &Path,
    frame_id: u16,
    frame: &BgrFrame,
    result: &DetectResult,
  ) -> Result<(), DirectoryRecordOutputError> {
    match self {
      RecordMode::Draw(draw) => {
        draw.draw_detections(frame, result).save(path)?;
      }
      RecordMode::Record { label_with_name } => {
        frame.to_rgb_image().save(path)?;
        let record = detection_record(frame_id, frame, result, *label_with_name);
        std::fs::write(
          path.with_extension("json"),
          serde_json::to_vec_pretty(&record)?,
        )?;
      }
    };

    Ok(())
  }
}

pub fn detection_record(
  frame_id: u16,
  frame: &BgrFrame,
  result: &DetectResult,
  label_with_name: bool,
) -> serde_json::Value {
  let detections = result
    .items
    .iter()
    .map(|item| {
      let label = if label_with_name {
        json!(item.label())
      } else {
        json!(item.class_id)
      };
      json!({
        "label": label,
        "score": item.score,
        "bbox": [item.x, item.y, item.width, item.height],
      })
    })
    .collect::<Vec<_>>();

  json!({
    "frame": frame_id,
    "width": frame.width(),
    "height": frame.height(),
    "detections": detections,
  })
}

/// 按日期分目录保存帧：`<dir>/YYYY/MM/DD/HH-MM-SS-<帧号>.png`
///
/// 默认只保存有检测结果的帧，`always` 参数保存每一帧。
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  mode: RecordMode,
  frame_counter: AtomicU16,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let mode = match uri.query_pairs().find(|(k, _)| k == "record") {
      Some((_, v)) => RecordMode::Record {
        label_with_name: v != "id",
      },
      None => RecordMode::Draw(Box::new(Draw::from_query(uri)?)),
    };

    let always = uri.query_pairs().any(|(k, _)| k == "always");

    Ok(DirectoryRecordOutput {
      directory: PathBuf::from(uri.path()),
      mode,
      frame_counter: AtomicU16::new(0),
      always,
    })
  }
}

impl DirectoryRecordOutput {
  fn frame_id(&self) -> u16 {
    self.frame_counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
  }

  fn frame_path(&self, frame_id: u16) -> Result<PathBuf, DirectoryRecordOutputError> {
    let now = Local::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;

    Ok(directory.join(format!("{}-{:04X}.png", now.format("%H-%M-%S"), frame_id)))
  }
}

impl Render<BgrFrame, DetectResult> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &BgrFrame, result: &DetectResult) -> Result<(), Self::Error> {
    let frame_id = self.frame_id();
    if self.always || !result.is_empty() {
      let path = self.frame_path(frame_id)?;
      self.mode.save_result(&path, frame_id, frame, result)?;
      debug!("记录帧 {}: {}", frame_id, path.display());
    }
    Ok(())
  }
}
