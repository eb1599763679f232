// 该文件是 Gamji （감지） 项目的一部分。
// src/output.rs - 输出定义
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::BgrFrame, model::DetectResult};

pub trait Render<Frame, Output>: Sized {
  type Error;
  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error>;
}

#[cfg(feature = "draw")]
pub mod draw;

mod log_output;
pub use self::log_output::{LogOutput, LogOutputError};

mod snapshot;
pub use self::snapshot::{SnapshotError, save_snapshot, snapshot_path};

mod video_recorder;
pub use self::video_recorder::{VideoRecorder, VideoRecorderError, recording_path};

#[cfg(feature = "save_image_file")]
mod save_image_file;
#[cfg(feature = "save_image_file")]
pub use self::save_image_file::{SaveImageFileError, SaveImageFileOutput};

#[cfg(feature = "save_video_file")]
mod save_video_file;
#[cfg(feature = "save_video_file")]
pub use self::save_video_file::{SaveVideoFileError, SaveVideoFileOutput};

#[cfg(feature = "directory_record")]
mod directory_record;
#[cfg(feature = "directory_record")]
pub use self::directory_record::{
  DirectoryRecordOutput, DirectoryRecordOutputError, RecordMode, detection_record,
};

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("日志输出错误: {0}")]
  LogOutputError(#[from] LogOutputError),
  #[cfg(feature = "save_image_file")]
  #[error("保存图像文件错误: {0}")]
  SaveImageFileError(#[from] SaveImageFileError),
  #[cfg(feature = "save_video_file")]
  #[error("保存视频文件错误: {0}")]
  SaveVideoFileError(#[from] SaveVideoFileError),
  #[cfg(feature = "directory_record")]
  #[error("目录记录输出错误: {0}")]
  DirectoryRecordOutputError(#[from] DirectoryRecordOutputError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

/// 按 URL 方案选择输出
pub enum OutputWrapper {
  Log(LogOutput),
  #[cfg(feature = "save_image_file")]
  SaveImageFileOutput(SaveImageFileOutput),
  #[cfg(feature = "save_video_file")]
  SaveVideoFileOutput(SaveVideoFileOutput),
  #[cfg(feature = "directory_record")]
  DirectoryRecordOutput(DirectoryRecordOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      LogOutput::SCHEME => Ok(OutputWrapper::Log(LogOutput::from_url(url)?)),
      #[cfg(feature = "save_image_file")]
      SaveImageFileOutput::SCHEME => {
        let output = SaveImageFileOutput::from_url(url)?;
        Ok(OutputWrapper::SaveImageFileOutput(output))
      }
      #[cfg(feature = "save_video_file")]
      SaveVideoFileOutput::SCHEME => {
        let output = SaveVideoFileOutput::from_url(url)?;
        Ok(OutputWrapper::SaveVideoFileOutput(output))
      }
      #[cfg(feature = "directory_record")]
      DirectoryRecordOutput::SCHEME => {
        let output = DirectoryRecordOutput::from_url(url)?;
        Ok(OutputWrapper::DirectoryRecordOutput(output))
      }
      _ => Err(OutputError::SchemeMismatch),
    }
  }
}

impl Render<BgrFrame, DetectResult> for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, frame: &BgrFrame, result: &DetectResult) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::Log(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
      #[cfg(feature = "save_image_file")]
      OutputWrapper::SaveImageFileOutput(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
      #[cfg(feature = "save_video_file")]
      OutputWrapper::SaveVideoFileOutput(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
      #[cfg(feature = "directory_record")]
      OutputWrapper::DirectoryRecordOutput(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dispatches_by_scheme() {
    let output = OutputWrapper::from_url(&Url::parse("log:").unwrap()).unwrap();
    assert!(matches!(output, OutputWrapper::Log(_)));

    assert!(matches!(
      OutputWrapper::from_url(&Url::parse("rtsp://camera/stream").unwrap()),
      Err(OutputError::SchemeMismatch)
    ));
  }

  #[cfg(feature = "directory_record")]
  #[test]
  fn folder_scheme_selects_directory_record() {
    let output = OutputWrapper::from_url(&Url::parse("folder:///tmp/gamji-out").unwrap()).unwrap();
    assert!(matches!(output, OutputWrapper::DirectoryRecordOutput(_)));
  }
}
