// 该文件是 Gamji （감지） 项目的一部分。
// src/process.rs - 帧预处理（对比度、翻转、灰度、红色掩膜、模糊、缩放）
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use image::{
  Rgb,
  imageops::{self, FilterType},
};
use imageproc::filter::{gaussian_blur_f32, separable_filter_equal};
use tracing::trace;

use crate::frame::BgrFrame;

const MIN_KERNEL_SIZE: u32 = 3;
const MIN_SIGMA: f64 = 0.1;

// 红色掩膜范围，OpenCV 8 位 HSV 约定：H ∈ [0, 180)
const RED_HUE_LOW: (u8, u8) = (0, 10);
const RED_HUE_HIGH: (u8, u8) = (160, 179);
const RED_MIN_SATURATION: u8 = 100;
const RED_MIN_VALUE: u8 = 50;

/// 操作员可调的图像处理参数
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorConfig {
  /// 对比度增益
  pub alpha: f64,
  /// 亮度偏移
  pub beta: f64,
  pub flip_horizontal: bool,
  pub flip_vertical: bool,
  pub gray: bool,
  /// 只保留红色区域，其余像素置黑
  pub red_mask: bool,
  pub box_blur: bool,
  pub gaussian_blur: bool,
  kernel_size: u32,
  sigma: f64,
  zoom: u32,
}

impl Default for ProcessorConfig {
  fn default() -> Self {
    Self {
      alpha: 1.0,
      beta: 0.0,
      flip_horizontal: false,
      flip_vertical: false,
      gray: false,
      red_mask: false,
      box_blur: false,
      gaussian_blur: false,
      kernel_size: 5,
      sigma: 1.2,
      zoom: 1,
    }
  }
}

impl ProcessorConfig {
  /// 均值模糊核边长，偶数向上取奇数，最小为 3
  pub fn with_kernel_size(mut self, size: u32) -> Self {
    let size = if size % 2 == 0 { size + 1 } else { size };
    self.kernel_size = size.max(MIN_KERNEL_SIZE);
    self
  }

  /// 高斯标准差，非正数视为 0.1，核半径取 ⌈2σ⌉
  pub fn with_sigma(mut self, sigma: f64) -> Self {
    self.sigma = if sigma > 0.0 { sigma.max(MIN_SIGMA) } else { MIN_SIGMA };
    self
  }

  /// 中心放大倍数，最小为 1
  pub fn with_zoom(mut self, zoom: u32) -> Self {
    self.zoom = zoom.max(1);
    self
  }

  pub fn kernel_size(&self) -> u32 {
    self.kernel_size
  }

  pub fn sigma(&self) -> f64 {
    self.sigma
  }

  pub fn zoom(&self) -> u32 {
    self.zoom
  }

  pub fn is_identity(&self) -> bool {
    self.alpha == 1.0
      && self.beta == 0.0
      && !self.flip_horizontal
      && !self.flip_vertical
      && !self.gray
      && !self.red_mask
      && !self.box_blur
      && !self.gaussian_blur
      && self.zoom == 1
  }
}

/// 按固定顺序应用各项处理：对比度、翻转、灰度、红色掩膜、均值模糊、高斯模糊、放大
#[derive(Debug, Clone, Default)]
pub struct FrameProcessor {
  config: ProcessorConfig,
}

impl FrameProcessor {
  pub fn new(config: ProcessorConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &ProcessorConfig {
    &self.config
  }

  pub fn set_config(&mut self, config: ProcessorConfig) {
    self.config = config;
  }

  pub fn run(&self, src: &BgrFrame) -> BgrFrame {
    let config = &self.config;
    let mut dst = src.clone();
    if src.is_empty() || config.is_identity() {
      return dst;
    }

    if config.alpha != 1.0 || config.beta != 0.0 {
      adjust_contrast(&mut dst, config.alpha, config.beta);
    }

    if config.flip_horizontal || config.flip_vertical {
      let mut buffer = dst.to_raw_buffer();
      if config.flip_horizontal {
        imageops::flip_horizontal_in_place(&mut buffer);
      }
      if config.flip_vertical {
        imageops::flip_vertical_in_place(&mut buffer);
      }
      dst = BgrFrame::from_raw_buffer(buffer);
    }

    if config.gray {
      let gray = imageops::grayscale_with_type::<Rgb<u8>, _>(&dst.to_rgb_image());
      dst = BgrFrame::from_rgb_image(&gray);
    }

    if config.red_mask {
      mask_red(&mut dst);
    }

    if config.box_blur {
      let size = config.kernel_size as usize;
      let kernel = vec![1.0 / size as f32; size];
      dst = BgrFrame::from_raw_buffer(separable_filter_equal(&dst.to_raw_buffer(), &kernel));
    }

    if config.gaussian_blur {
      let blurred = gaussian_blur_f32(&dst.to_raw_buffer(), config.sigma as f32);
      dst = BgrFrame::from_raw_buffer(blurred);
    }

    if config.zoom > 1 {
      dst = zoom_center(&dst, config.zoom);
    }

    trace!("帧处理完成: {}x{}", dst.width(), dst.height());
    dst
  }
}

fn adjust_contrast(frame: &mut BgrFrame, alpha: f64, beta: f64) {
  for value in frame.as_bytes_mut() {
    *value = (*value as f64 * alpha + beta).round_ties_even().clamp(0.0, 255.0) as u8;
  }
}

/// BGR 转 8 位 HSV，H ∈ [0, 180)，S/V ∈ [0, 255]
pub(crate) fn bgr_to_hsv([b, g, r]: [u8; 3]) -> [u8; 3] {
  let v = b.max(g).max(r);
  let min = b.min(g).min(r);
  let diff = (v - min) as f32;

  let s = if v == 0 {
    0
  } else {
    (255.0 * diff / v as f32).round() as u8
  };

  let h = if diff == 0.0 {
    0.0
  } else if v == r {
    30.0 * (g as f32 - b as f32) / diff
  } else if v == g {
    60.0 + 30.0 * (b as f32 - r as f32) / diff
  } else {
    120.0 + 30.0 * (r as f32 - g as f32) / diff
  };
  let h = if h < 0.0 { h + 180.0 } else { h };

  [h.round() as u8, s, v]
}

fn mask_red(frame: &mut BgrFrame) {
  for pixel in frame.as_bytes_mut().chunks_exact_mut(3) {
    let [h, s, v] = bgr_to_hsv([pixel[0], pixel[1], pixel[2]]);
    let red_hue = (RED_HUE_LOW.0..=RED_HUE_LOW.1).contains(&h)
      || (RED_HUE_HIGH.0..=RED_HUE_HIGH.1).contains(&h);
    if !(red_hue && s >= RED_MIN_SATURATION && v >= RED_MIN_VALUE) {
      pixel.fill(0);
    }
  }
}

/// 裁剪中心 1/zoom 区域后线性插值放大回原尺寸
fn zoom_center(frame: &BgrFrame, zoom: u32) -> BgrFrame {
  let (width, height) = (frame.width(), frame.height());
  let (crop_w, crop_h) = (width / zoom, height / zoom);
  if crop_w == 0 || crop_h == 0 {
    return frame.clone();
  }

  let buffer = frame.to_raw_buffer();
  let crop = imageops::crop_imm(
    &buffer,
    (width - crop_w) / 2,
    (height - crop_h) / 2,
    crop_w,
    crop_h,
  )
  .to_image();
  BgrFrame::from_raw_buffer(imageops::resize(&crop, width, height, FilterType::Triangle))
}
