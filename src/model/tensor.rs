// 该文件是 Gamji （감지） 项目的一部分。
// src/model/tensor.rs - 原始输出张量与布局归一化
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::borrow::Cow;

use tracing::debug;

use crate::model::DecodeError;

/// 模型输出的原始 f32 张量及其形状
#[derive(Debug, Clone, PartialEq)]
pub struct RawTensor {
  shape: Vec<usize>,
  data: Vec<f32>,
}

/// 输出张量的两种轴顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorLayout {
  /// (1, N, C)：每行一个候选框
  CandidatesMajor { candidates: usize },
  /// (1, C, N)：每行一个通道，需要转置
  ChannelMajor { candidates: usize },
}

impl TensorLayout {
  pub fn candidates(&self) -> usize {
    match *self {
      TensorLayout::CandidatesMajor { candidates } | TensorLayout::ChannelMajor { candidates } => {
        candidates
      }
    }
  }
}

/// 归一化后的 (N, C) 行优先矩阵
#[derive(Debug)]
pub(crate) struct CandidateMatrix<'a> {
  pub rows: usize,
  pub channels: usize,
  pub data: Cow<'a, [f32]>,
}

impl CandidateMatrix<'_> {
  pub fn row(&self, n: usize) -> &[f32] {
    &self.data[n * self.channels..(n + 1) * self.channels]
  }
}

impl RawTensor {
  pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self, DecodeError> {
    let expected: usize = shape.iter().product();
    if expected != data.len() {
      return Err(DecodeError::ShapeMismatch {
        shape,
        len: data.len(),
      });
    }
    Ok(Self { shape, data })
  }

  pub fn shape(&self) -> &[usize] {
    &self.shape
  }

  pub fn data(&self) -> &[f32] {
    &self.data
  }

  /// 根据每个候选框的通道数 `channels`（5 + 类别数）判断布局
  ///
  /// 两个尾部维度都不等于 `channels` 时直接报错，不做猜测。
  /// 两者都等于时按 (1, N, C) 处理。
  pub fn layout(&self, channels: usize) -> Result<TensorLayout, DecodeError> {
    match self.shape.as_slice() {
      &[1, d1, d2] if d2 == channels => Ok(TensorLayout::CandidatesMajor { candidates: d1 }),
      &[1, d1, d2] if d1 == channels => Ok(TensorLayout::ChannelMajor { candidates: d2 }),
      _ => Err(DecodeError::UnexpectedLayout {
        shape: self.shape.clone(),
        channels,
      }),
    }
  }

  pub(crate) fn normalize(&self, channels: usize) -> Result<CandidateMatrix<'_>, DecodeError> {
    let layout = self.layout(channels)?;
    debug!("输出张量形状 {:?}, 布局 {:?}", self.shape, layout);

    let data = match layout {
      TensorLayout::CandidatesMajor { .. } => Cow::Borrowed(self.data.as_slice()),
      TensorLayout::ChannelMajor { candidates } => {
        let mut transposed = vec![0.0f32; candidates * channels];
        for n in 0..candidates {
          for c in 0..channels {
            transposed[n * channels + c] = self.data[c * candidates + n];
          }
        }
        Cow::Owned(transposed)
      }
    };

    Ok(CandidateMatrix {
      rows: layout.candidates(),
      channels,
      data,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn new_checks_element_count() {
    let err = RawTensor::new(vec![1, 2, 3], vec![0.0; 5]).unwrap_err();
    assert!(matches!(err, DecodeError::ShapeMismatch { len: 5, .. }));
  }

  #[test]
  fn layout_prefers_trailing_channels() {
    let tensor = RawTensor::new(vec![1, 7, 7], vec![0.0; 49]).unwrap();
    assert_eq!(
      tensor.layout(7).unwrap(),
      TensorLayout::CandidatesMajor { candidates: 7 }
    );
  }

  #[test]
  fn layout_rejects_unknown_shapes() {
    let tensor = RawTensor::new(vec![1, 40, 40], vec![0.0; 1600]).unwrap();
    assert!(matches!(
      tensor.layout(85),
      Err(DecodeError::UnexpectedLayout { .. })
    ));

    let batched = RawTensor::new(vec![2, 3, 85], vec![0.0; 510]).unwrap();
    assert!(batched.layout(85).is_err());

    let flat = RawTensor::new(vec![85], vec![0.0; 85]).unwrap();
    assert!(flat.layout(85).is_err());
  }

  #[test]
  fn channel_major_is_transposed_element_by_element() {
    // 3 个候选，每个 2 通道：源为 [c][n]
    let tensor = RawTensor::new(vec![1, 2, 3], vec![1.0, 2.0, 3.0, 10.0, 20.0, 30.0]).unwrap();
    let matrix = tensor.normalize(2).unwrap();
    assert_eq!(matrix.rows, 3);
    assert_eq!(matrix.row(0), &[1.0, 10.0]);
    assert_eq!(matrix.row(1), &[2.0, 20.0]);
    assert_eq!(matrix.row(2), &[3.0, 30.0]);
  }

  #[test]
  fn candidates_major_borrows_without_copy() {
    let tensor = RawTensor::new(vec![1, 2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    let matrix = tensor.normalize(2).unwrap();
    assert!(matches!(matrix.data, Cow::Borrowed(_)));
    assert_eq!(matrix.row(1), &[3.0, 4.0]);
  }
}
