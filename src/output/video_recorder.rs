// 该文件是 Gamji （감지） 项目的一部分。
// src/output/video_recorder.rs - 录像（通过 ffmpeg 管道编码）
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

//! 录像模块
//!
//! 原始 BGR 帧直接写入 `ffmpeg` 的标准输入，容器与编码器由 ffmpeg 根据
//! 输出文件扩展名决定。此模块需要系统安装 ffmpeg 命令行工具。

use std::{
  io::Write,
  path::{Path, PathBuf},
  process::{Child, ChildStdin, Command, Stdio},
  sync::{
    Mutex, MutexGuard,
    atomic::{AtomicU64, Ordering},
  },
};

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::frame::BgrFrame;

#[derive(Error, Debug)]
pub enum VideoRecorderError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("视频编码错误: {0}")]
  EncodingError(String),
  #[error("没有可写入的帧")]
  EmptyFrame,
  #[error("帧尺寸变化: 录像为 {expected:?}, 实际为 {actual:?}")]
  SizeMismatch {
    expected: (u32, u32),
    actual: (u32, u32),
  },
}

struct Encoder {
  child: Child,
  stdin: ChildStdin,
  size: (u32, u32),
}

impl Encoder {
  fn spawn(path: &Path, size: (u32, u32), fps: f64) -> Result<Self, VideoRecorderError> {
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    let mut child = Command::new("ffmpeg")
      .arg("-y") // 覆盖已存在的文件
      .args(["-loglevel", "error"])
      .args(["-f", "rawvideo", "-pix_fmt", "bgr24"])
      .arg("-s")
      .arg(format!("{}x{}", size.0, size.1))
      .arg("-framerate")
      .arg(fps.to_string())
      .args(["-i", "-"])
      .arg(path)
      .stdin(Stdio::piped())
      .stdout(Stdio::null())
      .spawn()
      .map_err(|e| {
        error!("无法执行 ffmpeg: {}", e);
        VideoRecorderError::EncodingError(format!("无法执行 ffmpeg (请确保已安装): {}", e))
      })?;

    let stdin = child
      .stdin
      .take()
      .ok_or_else(|| VideoRecorderError::EncodingError("ffmpeg 标准输入不可用".to_string()))?;

    info!(
      "开始录像: {} ({}x{} @ {} fps)",
      path.display(),
      size.0,
      size.1,
      fps
    );
    Ok(Self { child, stdin, size })
  }
}

/// 录像器，第一帧到达时启动编码进程，帧尺寸以第一帧为准
///
/// 内部以互斥锁保护编码器，可以在采集线程与控制线程之间共享。
pub struct VideoRecorder {
  path: PathBuf,
  fps: f64,
  encoder: Mutex<Option<Encoder>>,
  frames: AtomicU64,
}

impl VideoRecorder {
  pub fn new(path: impl Into<PathBuf>, fps: f64) -> Self {
    Self {
      path: path.into(),
      fps,
      encoder: Mutex::new(None),
      frames: AtomicU64::new(0),
    }
  }

  /// 在目录下以 `rec_YYYYMMDD_HHMMSS.mp4` 命名
  pub fn timestamped(directory: &Path, fps: f64) -> Self {
    Self::new(recording_path(directory, Local::now()), fps)
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn frames(&self) -> u64 {
    self.frames.load(Ordering::Relaxed)
  }

  fn encoder(&self) -> MutexGuard<'_, Option<Encoder>> {
    self.encoder.lock().unwrap_or_else(|e| e.into_inner())
  }

  pub fn write_frame(&self, frame: &BgrFrame) -> Result<(), VideoRecorderError> {
    if frame.is_empty() {
      return Err(VideoRecorderError::EmptyFrame);
    }

    let size = (frame.width(), frame.height());
    let mut slot = self.encoder();
    if slot.is_none() {
      *slot = Some(Encoder::spawn(&self.path, size, self.fps)?);
    }
    let Some(encoder) = slot.as_mut() else {
      return Err(VideoRecorderError::EncodingError("编码器未启动".to_string()));
    };

    if encoder.size != size {
      return Err(VideoRecorderError::SizeMismatch {
        expected: encoder.size,
        actual: size,
      });
    }

    encoder.stdin.write_all(frame.as_bytes())?;
    self.frames.fetch_add(1, Ordering::Relaxed);
    Ok(())
  }

  /// 关闭管道并等待编码完成，未写入任何帧时什么也不做
  pub fn finish(&self) -> Result<(), VideoRecorderError> {
    let Some(Encoder {
      mut child, stdin, ..
    }) = self.encoder().take()
    else {
      return Ok(());
    };

    drop(stdin);
    let status = child.wait()?;
    if !status.success() {
      return Err(VideoRecorderError::EncodingError(format!(
        "ffmpeg 退出状态: {}",
        status
      )));
    }

    info!("录像已保存: {} ({} 帧)", self.path.display(), self.frames());
    Ok(())
  }
}

impl Drop for VideoRecorder {
  fn drop(&mut self) {
    debug!("释放录像器: {}", self.path.display());
    if let Err(e) = self.finish() {
      error!("完成录像时出错: {}", e);
    }
  }
}

pub fn recording_path(directory: &Path, now: DateTime<Local>) -> PathBuf {
  directory.join(format!("rec_{}.mp4", now.format("%Y%m%d_%H%M%S")))
}
