// 该文件是 Gamji （감지） 项目的一部分。
// src/frame.rs - BGR 帧定义
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use image::{ImageBuffer, Rgb, RgbImage};
use thiserror::Error;

const BGR_CHANNELS: usize = 3;

/// 通道顺序无关的原始像素缓冲，仅用于几何变换（翻转、裁剪、缩放）
pub(crate) type RawBuffer = ImageBuffer<Rgb<u8>, Vec<u8>>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrameError {
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
}

/// 交错存储的 8 位 BGR 帧，相机侧交付的原始格式
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BgrFrame {
  width: u32,
  height: u32,
  data: Box<[u8]>,
}

impl BgrFrame {
  pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, FrameError> {
    let expected = BGR_CHANNELS * width as usize * height as usize;
    if data.len() != expected {
      return Err(FrameError::LengthMismatch {
        expected,
        actual: data.len(),
      });
    }

    Ok(Self {
      width,
      height,
      data: data.into_boxed_slice(),
    })
  }

  /// 以单一颜色填充整帧
  pub fn filled(width: u32, height: u32, bgr: [u8; 3]) -> Self {
    let data = bgr
      .iter()
      .copied()
      .cycle()
      .take(BGR_CHANNELS * width as usize * height as usize)
      .collect::<Vec<_>>();
    Self {
      width,
      height,
      data: data.into_boxed_slice(),
    }
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn channels(&self) -> usize {
    BGR_CHANNELS
  }

  pub fn is_empty(&self) -> bool {
    self.width == 0 || self.height == 0
  }

  pub fn as_bytes(&self) -> &[u8] {
    &self.data
  }

  pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
    &mut self.data
  }

  /// 读取 (x, y) 处的 BGR 像素
  pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
    let idx = (y as usize * self.width as usize + x as usize) * BGR_CHANNELS;
    [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
  }

  /// 交换 B/R 通道得到 RGB 图像
  pub fn to_rgb_image(&self) -> RgbImage {
    ImageBuffer::from_fn(self.width, self.height, |x, y| {
      let [b, g, r] = self.pixel(x, y);
      Rgb([r, g, b])
    })
  }

  pub fn from_rgb_image(image: &RgbImage) -> Self {
    let mut data = Vec::with_capacity(image.as_raw().len());
    for pixel in image.pixels() {
      let [r, g, b] = pixel.0;
      data.extend_from_slice(&[b, g, r]);
    }
    Self {
      width: image.width(),
      height: image.height(),
      data: data.into_boxed_slice(),
    }
  }

  pub(crate) fn to_raw_buffer(&self) -> RawBuffer {
    ImageBuffer::from_fn(self.width, self.height, |x, y| Rgb(self.pixel(x, y)))
  }

  pub(crate) fn from_raw_buffer(buffer: RawBuffer) -> Self {
    let (width, height) = buffer.dimensions();
    Self {
      width,
      height,
      data: buffer.into_raw().into_boxed_slice(),
    }
  }
}

impl AsRef<[u8]> for BgrFrame {
  fn as_ref(&self) -> &[u8] {
    &self.data
  }
}
