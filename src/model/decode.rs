// 该文件是 Gamji （감지） 项目的一部分。
// src/model/decode.rs - 检测输出解码与非极大值抑制
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

//! 将模型原始输出解码为源图像坐标下的检测框。
//!
//! 每个候选框的通道依次为 `cx, cy, w, h, objectness, class_0 .. class_{K-1}`，
//! 坐标位于模型输入空间 `[0, input_size)`。解码流程：
//!
//! 1. 布局归一化：(1, N, C) 直接使用，(1, C, N) 转置，其余形状报错
//! 2. 取最佳类别，分数 = objectness × 最佳类别分数，低于阈值直接丢弃
//! 3. 按宽、高两个方向各自的比例缩放到源图像，并裁剪到图像范围内
//! 4. 按分数降序做贪心 NMS
//!
//! NMS 默认不区分类别：重叠超过阈值的框无论类别都会被抑制，
//! 这与模型族自带的后处理一致。需要按类别抑制时使用
//! [`SuppressionMode::PerClass`]。

use tracing::debug;

use crate::model::{
  DecodeError, DetectorConfig, Detection, RawTensor, SuppressionMode, config::BOX_CHANNELS,
};

pub fn decode(
  raw: &RawTensor,
  source_width: u32,
  source_height: u32,
  config: &DetectorConfig,
) -> Result<Vec<Detection>, DecodeError> {
  let matrix = raw.normalize(config.channels())?;

  let input_size = config.input_size as f32;
  let scale_x = source_width as f32 / input_size;
  let scale_y = source_height as f32 / input_size;
  let (limit_x, limit_y) = (source_width as f32, source_height as f32);

  let mut candidates = Vec::new();
  for n in 0..matrix.rows {
    let row = matrix.row(n);

    let Some((class_id, class_score)) = best_class(&row[BOX_CHANNELS..]) else {
      continue;
    };
    let score = row[4] * class_score;
    // NaN 分数同样被拒绝
    if !(score >= config.confidence_threshold) {
      continue;
    }

    let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
    if ![cx, cy, w, h].iter().all(|v| v.is_finite()) {
      continue;
    }

    let x0 = (cx - w * 0.5) * scale_x;
    let y0 = (cy - h * 0.5) * scale_y;
    let x1 = x0 + w * scale_x;
    let y1 = y0 + h * scale_y;

    let left = x0.max(0.0);
    let top = y0.max(0.0);
    let right = x1.min(limit_x);
    let bottom = y1.min(limit_y);

    let width = fit_extent(left, right);
    let height = fit_extent(top, bottom);
    if width <= 0.0 || height <= 0.0 {
      continue;
    }

    candidates.push(Detection {
      x: left,
      y: top,
      width,
      height,
      class_id,
      score,
    });
  }

  debug!(
    "候选框 {} 个, 通过置信度过滤 {} 个",
    matrix.rows,
    candidates.len()
  );

  let detections = suppress(candidates, config.iou_threshold, config.suppression);
  debug!("NMS 后保留 {} 个检测框", detections.len());

  Ok(detections)
}

/// 最佳类别及其分数，平分时取最小索引，NaN 不参与比较
fn best_class(scores: &[f32]) -> Option<(usize, f32)> {
  let mut best: Option<(usize, f32)> = None;
  for (index, &score) in scores.iter().enumerate() {
    if score.is_nan() {
      continue;
    }
    if best.is_none_or(|(_, top)| score > top) {
      best = Some((index, score));
    }
  }
  best
}

/// `end - start`，并保证 `start + extent <= end` 在 f32 下成立
fn fit_extent(start: f32, end: f32) -> f32 {
  let mut extent = end - start;
  while extent > 0.0 && start + extent > end {
    extent = f32::from_bits(extent.to_bits() - 1);
  }
  extent
}

/// 贪心非极大值抑制，返回按分数降序排列的保留框
pub fn suppress(
  mut detections: Vec<Detection>,
  iou_threshold: f32,
  mode: SuppressionMode,
) -> Vec<Detection> {
  // 稳定排序，同分时保持原始顺序
  detections.sort_by(|a, b| b.score.total_cmp(&a.score));

  let mut result = Vec::new();

  while !detections.is_empty() {
    let best = detections.remove(0);

    detections.retain(|det| {
      if mode == SuppressionMode::PerClass && det.class_id != best.class_id {
        return true;
      }
      iou(&best, det) <= iou_threshold
    });

    result.push(best);
  }

  result
}

/// 计算两个边界框的 IoU
pub fn iou(a: &Detection, b: &Detection) -> f32 {
  let x1 = a.x.max(b.x);
  let y1 = a.y.max(b.y);
  let x2 = a.right().min(b.right());
  let y2 = a.bottom().min(b.bottom());

  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let union = a.area() + b.area() - intersection;

  if union > 0.0 {
    intersection / union
  } else {
    0.0
  }
}
