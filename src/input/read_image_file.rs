// 该文件是 Gamji （감지） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{
  path::Path,
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  thread::{self, JoinHandle},
  time::Duration,
};

use image::ImageReader;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::BgrFrame,
  input::{FrameDispatcher, FrameSource},
};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI 方案不匹配")]
  SchemaMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像加载错误: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("帧率无效: {0}")]
  InvalidFps(String),
  #[error("图像为空")]
  EmptyImage,
}

const DEFAULT_REPLAY_FPS: f64 = 30.0;
const MAX_REPLAY_FPS: f64 = 120.0;

/// 静态图像输入
///
/// 作为迭代器时只产出一帧；作为帧源时按固定帧率重复分发同一帧，
/// 在离线运行时代替相机。
pub struct ImageFileInput {
  frame: BgrFrame,
  fps: f64,
  pending: bool,
  running: Arc<AtomicBool>,
  worker: Option<JoinHandle<()>>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let fps = match url.query_pairs().find(|(k, _)| k == "fps") {
      Some((_, v)) => v
        .parse::<f64>()
        .ok()
        .filter(|fps| *fps > 0.0 && *fps <= MAX_REPLAY_FPS)
        .ok_or_else(|| ImageFileInputError::InvalidFps(v.to_string()))?,
      None => DEFAULT_REPLAY_FPS,
    };

    let input = Self::open(url.path())?.with_fps(fps);
    Ok(input)
  }
}

impl ImageFileInput {
  pub fn open(path: impl AsRef<Path>) -> Result<Self, ImageFileInputError> {
    let image = ImageReader::open(path.as_ref())?.decode()?.to_rgb8();
    let frame = BgrFrame::from_rgb_image(&image);
    if frame.is_empty() {
      return Err(ImageFileInputError::EmptyImage);
    }
    info!(
      "加载图像 {}: {}x{}",
      path.as_ref().display(),
      frame.width(),
      frame.height()
    );
    Ok(Self::from_frame(frame))
  }

  pub fn from_frame(frame: BgrFrame) -> Self {
    Self {
      frame,
      fps: DEFAULT_REPLAY_FPS,
      pending: true,
      running: Arc::new(AtomicBool::new(false)),
      worker: None,
    }
  }

  pub fn with_fps(mut self, fps: f64) -> Self {
    self.fps = fps;
    self
  }

  pub fn frame(&self) -> &BgrFrame {
    &self.frame
  }

  pub fn is_running(&self) -> bool {
    self.worker.is_some()
  }
}

impl Iterator for ImageFileInput {
  type Item = BgrFrame;

  fn next(&mut self) -> Option<Self::Item> {
    if self.pending {
      self.pending = false;
      Some(self.frame.clone())
    } else {
      None
    }
  }
}

impl FrameSource for ImageFileInput {
  type Error = ImageFileInputError;

  fn start(&mut self, dispatcher: Arc<FrameDispatcher>) -> Result<(), Self::Error> {
    if self.worker.is_some() {
      warn!("图像回放已在运行");
      return Ok(());
    }

    let frame = self.frame.clone();
    let running = self.running.clone();
    let interval = Duration::from_secs_f64(1.0 / self.fps);
    running.store(true, Ordering::Release);

    let worker = thread::Builder::new()
      .name("image-replay".into())
      .spawn(move || {
        debug!("图像回放线程启动，间隔 {:.2?}", interval);
        while running.load(Ordering::Acquire) {
          dispatcher.dispatch(frame.clone());
          thread::sleep(interval);
        }
        debug!("图像回放线程退出");
      })?;
    self.worker = Some(worker);

    info!("开始回放图像，帧率 {:.1} fps", self.fps);
    Ok(())
  }

  fn stop(&mut self) {
    self.running.store(false, Ordering::Release);
    if let Some(worker) = self.worker.take()
      && worker.join().is_err()
    {
      warn!("图像回放线程异常退出");
    }
  }

  fn width(&self) -> u32 {
    self.frame.width()
  }

  fn height(&self) -> u32 {
    self.frame.height()
  }

  fn fps(&self) -> Option<f64> {
    Some(self.fps)
  }
}

impl Drop for ImageFileInput {
  fn drop(&mut self) {
    self.stop();
  }
}

#[cfg(test)]
mod tests {
  use std::sync::mpsc;

  use image::{Rgb, RgbImage};

  use super::*;

  #[test]
  fn iterator_yields_single_frame() {
    let mut input = ImageFileInput::from_frame(BgrFrame::filled(3, 2, [1, 2, 3]));
    assert_eq!(input.next().map(|f| f.width()), Some(3));
    assert!(input.next().is_none());
  }

  #[test]
  fn rejects_other_schemes() {
    let url = Url::parse("video:///tmp/a.png").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::SchemaMismatch)
    ));
  }

  #[test]
  fn rejects_invalid_fps() {
    let url = Url::parse("image:///tmp/a.png?fps=0").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::InvalidFps(_))
    ));
  }

  #[test]
  fn loads_png_as_bgr() {
    let path = std::env::temp_dir().join(format!("gamji-input-{}.png", std::process::id()));
    RgbImage::from_pixel(4, 3, Rgb([200, 100, 50]))
      .save(&path)
      .unwrap();

    let url = Url::parse(&format!("image://{}?fps=5", path.display())).unwrap();
    let input = ImageFileInput::from_url(&url).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(input.width(), 4);
    assert_eq!(input.height(), 3);
    assert_eq!(input.fps(), Some(5.0));
    assert_eq!(input.frame().pixel(0, 0), [50, 100, 200]);
  }

  #[test]
  fn replay_dispatches_until_stopped() {
    let dispatcher = Arc::new(FrameDispatcher::new());
    let (tx, rx) = mpsc::channel();
    dispatcher.subscribe(move |frame| {
      let _ = tx.send(frame);
    });

    let mut input = ImageFileInput::from_frame(BgrFrame::filled(2, 2, [7, 7, 7])).with_fps(100.0);
    input.start(dispatcher.clone()).unwrap();
    for _ in 0..3 {
      let frame = rx.recv_timeout(Duration::from_secs(5)).unwrap();
      assert_eq!(frame.pixel(1, 1), [7, 7, 7]);
    }
    input.stop();
    assert!(!input.is_running());

    let delivered = dispatcher.delivered();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(dispatcher.delivered(), delivered);
  }
}
