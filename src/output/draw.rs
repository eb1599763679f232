// 该文件是 Gamji （감지） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};
use thiserror::Error;
use tracing::info;

use crate::{
  frame::BgrFrame,
  model::{DetectResult, Detection},
};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_PADDING: u32 = 2;
const BOX_THICKNESS: i32 = 2;
const BOX_COLOR: [u8; 3] = [0, 255, 0]; // 绿色
const TEXT_COLOR: [u8; 3] = [0, 0, 0];

static DEFAULT_FONT: &[u8] = include_bytes!("../../assets/font.ttf");

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("字体加载错误: {0}")]
  FontLoadError(String),
}

/// 在 RGB 图像上绘制检测框与 “类别 分数” 标签
///
/// 默认使用内嵌字体，可通过 `font` 查询参数替换为外部字体文件。
pub struct Draw {
  font_size: f32,
  box_color: [u8; 3],
  font: FontArc,
}

impl Default for Draw {
  fn default() -> Self {
    let font = FontArc::try_from_slice(DEFAULT_FONT).expect("无法加载嵌入的字体文件");
    Self {
      font_size: LABEL_FONT_SIZE,
      box_color: BOX_COLOR,
      font,
    }
  }
}

impl Draw {
  pub fn with_font_file(mut self, path: impl AsRef<Path>) -> Result<Self, DrawError> {
    let data = std::fs::read(path.as_ref())?;
    let font = FontArc::try_from_vec(data).map_err(|e| DrawError::FontLoadError(e.to_string()))?;
    info!("加载字体: {}", path.as_ref().display());
    self.font = font;
    Ok(self)
  }

  /// 从 URL 查询参数 `font` 读取字体路径
  pub fn from_query(url: &url::Url) -> Result<Self, DrawError> {
    match url.query_pairs().find(|(k, _)| k == "font") {
      Some((_, path)) => Self::default().with_font_file(path.as_ref()),
      None => Ok(Self::default()),
    }
  }

  pub fn with_box_color(mut self, color: [u8; 3]) -> Self {
    self.box_color = color;
    self
  }

  pub fn draw_detections(&self, frame: &BgrFrame, result: &DetectResult) -> RgbImage {
    let mut image = frame.to_rgb_image();
    self.draw_on_image(&mut image, result);
    image
  }

  pub fn draw_on_image(&self, image: &mut RgbImage, result: &DetectResult) {
    for item in result.items.iter() {
      self.draw_bbox_with_label(image, item);
    }
  }

  fn draw_bbox_with_label(&self, image: &mut RgbImage, item: &Detection) {
    let (w, h) = (image.width() as i32, image.height() as i32);

    let x_min = (item.x.floor() as i32).clamp(0, w);
    let y_min = (item.y.floor() as i32).clamp(0, h);
    let x_max = (item.right().ceil() as i32).clamp(0, w);
    let y_max = (item.bottom().ceil() as i32).clamp(0, h);

    // 边框向内加粗
    for t in 0..BOX_THICKNESS {
      let width = x_max - x_min - 2 * t;
      let height = y_max - y_min - 2 * t;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect = Rect::at(x_min + t, y_min + t).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(image, rect, Rgb(self.box_color));
    }

    let label = format!("{} {:.2}", item.label(), item.score);
    let scale = PxScale::from(self.font_size);
    let (text_width, text_height) = text_size(scale, &self.font, &label);

    // 标签放在边框上方，空间不足时贴住图像顶部
    let label_height = text_height + 2 * LABEL_PADDING;
    let label_y = (y_min - label_height as i32).max(0);
    let label_width = (text_width + 2 * LABEL_PADDING).min((w - x_min).max(0) as u32);
    if label_width == 0 {
      return;
    }

    let rect = Rect::at(x_min, label_y).of_size(label_width, label_height);
    draw_filled_rect_mut(image, rect, Rgb(self.box_color));
    draw_text_mut(
      image,
      Rgb(TEXT_COLOR),
      x_min + LABEL_PADDING as i32,
      label_y + LABEL_PADDING as i32,
      scale,
      &self.font,
      &label,
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn detection(x: f32, y: f32, width: f32, height: f32) -> Detection {
    Detection {
      x,
      y,
      width,
      height,
      class_id: 0,
      score: 0.9,
    }
  }

  #[test]
  fn empty_result_keeps_frame() {
    let frame = BgrFrame::filled(8, 8, [1, 2, 3]);
    let image = Draw::default().draw_detections(&frame, &DetectResult::default());
    assert_eq!(image, frame.to_rgb_image());
  }

  fn lit_pixels(image: &RgbImage, x: std::ops::Range<u32>, y: std::ops::Range<u32>) -> usize {
    y.flat_map(|py| x.clone().map(move |px| (px, py)))
      .filter(|&(px, py)| image.get_pixel(px, py) != &Rgb([0, 0, 0]))
      .count()
  }

  #[test]
  fn draws_box_outline() {
    let frame = BgrFrame::filled(40, 40, [0, 0, 0]);
    let result = DetectResult::new(vec![detection(5.0, 25.0, 10.0, 10.0)]);
    let image = Draw::default().draw_detections(&frame, &result);

    assert_eq!(image.get_pixel(5, 25), &Rgb(BOX_COLOR));
    assert_eq!(image.get_pixel(6, 30), &Rgb(BOX_COLOR));
    assert_eq!(image.get_pixel(14, 34), &Rgb(BOX_COLOR));
    assert_eq!(image.get_pixel(10, 30), &Rgb([0, 0, 0]));
    assert_eq!(image.get_pixel(30, 30), &Rgb([0, 0, 0]));
  }

  #[test]
  fn label_is_drawn_above_box() {
    let frame = BgrFrame::filled(200, 140, [0, 0, 0]);
    let result = DetectResult::new(vec![detection(20.0, 80.0, 100.0, 40.0)]);
    let image = Draw::default().draw_detections(&frame, &result);

    assert!(lit_pixels(&image, 20..120, 45..80) > 0);
    assert_eq!(lit_pixels(&image, 0..200, 0..45), 0);

    // 抗锯齿的字形边缘介于框色与文字颜色之间
    let glyph_edges = (45..80)
      .flat_map(|y| (20..120).map(move |x| (x, y)))
      .filter(|&(x, y)| {
        let [_, g, _] = image.get_pixel(x, y).0;
        g > 0 && g < 255
      })
      .count();
    assert!(glyph_edges > 0);
  }

  #[test]
  fn label_without_headroom_sticks_to_top() {
    let frame = BgrFrame::filled(200, 120, [0, 0, 0]);
    let result = DetectResult::new(vec![detection(20.0, 0.0, 100.0, 40.0)]);
    let image = Draw::default().draw_detections(&frame, &result);
    assert!(lit_pixels(&image, 22..118, 2..20) > 0);
  }

  #[test]
  fn box_touching_border_is_clamped() {
    let frame = BgrFrame::filled(10, 10, [0, 0, 0]);
    let result = DetectResult::new(vec![detection(6.0, 0.0, 4.0, 10.0)]);
    let image = Draw::default().draw_detections(&frame, &result);
    assert_eq!(image.get_pixel(9, 9), &Rgb(BOX_COLOR));
  }

  #[test]
  fn invalid_font_file_is_rejected() {
    let path = std::env::temp_dir().join(format!("gamji_bad_font_{}.ttf", std::process::id()));
    std::fs::write(&path, b"not a font").unwrap();
    let result = Draw::default().with_font_file(&path);
    std::fs::remove_file(&path).ok();
    assert!(matches!(result, Err(DrawError::FontLoadError(_))));
  }

  #[test]
  fn missing_font_file_is_io_error() {
    let result = Draw::default().with_font_file("/nonexistent/gamji/font.ttf");
    assert!(matches!(result, Err(DrawError::IoError(_))));
  }
}
