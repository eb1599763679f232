// 该文件是 Gamji （감지） 项目的一部分。
// src/output/save_video_file.rs - 保存视频文件
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

//! 视频文件输出模块
//!
//! 将叠加了检测结果的帧写入视频文件。
//!
//! # URL 格式
//!
//! - `video:///path/to/output.mp4` - 指定输出视频路径，默认 25 fps
//! - `video:///path/to/output.mp4?fps=30` - 指定输出视频路径和帧率
//! - `video:///path/to/output.mp4?font=/path/to/font.ttf` - 绘制标签文字

use thiserror::Error;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::BgrFrame,
  model::DetectResult,
  output::{
    Render,
    draw::{Draw, DrawError},
    video_recorder::{VideoRecorder, VideoRecorderError},
  },
};

#[derive(Error, Debug)]
pub enum SaveVideoFileError {
  #[error("录像错误: {0}")]
  RecorderError(#[from] VideoRecorderError),
  #[error("绘制错误: {0}")]
  DrawError(#[from] DrawError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("参数验证错误: {0}")]
  ValidationError(String),
}

const DEFAULT_FPS: u32 = 25;
const MIN_FPS: u32 = 1;
const MAX_FPS: u32 = 120;

pub struct SaveVideoFileOutput {
  recorder: VideoRecorder,
  draw: Draw,
}

impl FromUrlWithScheme for SaveVideoFileOutput {
  const SCHEME: &'static str = "video";
}

impl FromUrl for SaveVideoFileOutput {
  type Error = SaveVideoFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveVideoFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    // 从 URL 查询参数中获取 FPS（如果有的话）
    let fps = uri
      .query_pairs()
      .find(|(k, _)| k == "fps")
      .and_then(|(_, v)| v.parse::<u32>().ok())
      .unwrap_or(DEFAULT_FPS);

    if !(MIN_FPS..=MAX_FPS).contains(&fps) {
      return Err(SaveVideoFileError::ValidationError(format!(
        "FPS {} 超出有效范围 [{}, {}]",
        fps, MIN_FPS, MAX_FPS
      )));
    }

    Ok(SaveVideoFileOutput {
      recorder: VideoRecorder::new(uri.path(), fps as f64),
      draw: Draw::from_query(uri)?,
    })
  }
}

impl SaveVideoFileOutput {
  pub fn recorder(&self) -> &VideoRecorder {
    &self.recorder
  }
}

impl Render<BgrFrame, DetectResult> for SaveVideoFileOutput {
  type Error = SaveVideoFileError;

  fn render_result(&self, frame: &BgrFrame, result: &DetectResult) -> Result<(), Self::Error> {
    let image = self.draw.draw_detections(frame, result);
    self
      .recorder
      .write_frame(&BgrFrame::from_rgb_image(&image))?;
    Ok(())
  }
}
