// 该文件是 Gamji （감지） 项目的一部分。
// tests/common/mod.rs - 测试用推理后端
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

#![allow(dead_code)]

use std::{
  convert::Infallible,
  sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
  },
};

use gamji::{
  frame::BgrFrame,
  model::{DetectResult, InferError, LoadError, Model, ModelLoader, RawTensor},
  output::Render,
};

pub const CHANNELS: usize = 85;

/// 一行候选：cx, cy, w, h, objectness, 类别分数
pub fn candidate(
  cx: f32,
  cy: f32,
  w: f32,
  h: f32,
  obj: f32,
  class_id: usize,
  score: f32,
) -> Vec<f32> {
  let mut row = vec![0.0; CHANNELS];
  row[..5].copy_from_slice(&[cx, cy, w, h, obj]);
  row[5 + class_id] = score;
  row
}

pub fn candidates_major(rows: &[Vec<f32>]) -> RawTensor {
  RawTensor::new(vec![1, rows.len(), CHANNELS], rows.concat()).unwrap()
}

pub fn channel_major(rows: &[Vec<f32>]) -> RawTensor {
  let n = rows.len();
  let mut data = vec![0.0; n * CHANNELS];
  for (i, row) in rows.iter().enumerate() {
    for (c, value) in row.iter().enumerate() {
      data[c * n + i] = *value;
    }
  }
  RawTensor::new(vec![1, CHANNELS, n], data).unwrap()
}

pub struct ScriptedModel {
  output: Result<RawTensor, String>,
  input_size: u32,
}

impl Model for ScriptedModel {
  type Input = BgrFrame;
  type Output = RawTensor;
  type Error = InferError;

  fn infer(&mut self, _input: &BgrFrame) -> Result<RawTensor, InferError> {
    self.output.clone().map_err(InferError::Backend)
  }

  fn input_size(&self) -> u32 {
    self.input_size
  }
}

/// 每次加载返回同一脚本输出，并记录加载次数
pub struct ScriptedLoader {
  output: Result<RawTensor, String>,
  input_size: u32,
  loads: Arc<AtomicUsize>,
}

impl ScriptedLoader {
  pub fn new(output: Result<RawTensor, String>) -> Self {
    Self {
      output,
      input_size: 640,
      loads: Arc::new(AtomicUsize::new(0)),
    }
  }

  pub fn loads(&self) -> Arc<AtomicUsize> {
    self.loads.clone()
  }
}

impl ModelLoader for ScriptedLoader {
  type Model = ScriptedModel;

  fn load(&self) -> Result<ScriptedModel, LoadError> {
    self.loads.fetch_add(1, Ordering::SeqCst);
    Ok(ScriptedModel {
      output: self.output.clone(),
      input_size: self.input_size,
    })
  }
}

/// 收集每次渲染的结果
#[derive(Clone, Default)]
pub struct CollectingOutput {
  pub results: Arc<Mutex<Vec<(u32, u32, DetectResult)>>>,
}

impl Render<BgrFrame, DetectResult> for CollectingOutput {
  type Error = Infallible;

  fn render_result(&self, frame: &BgrFrame, result: &DetectResult) -> Result<(), Infallible> {
    self
      .results
      .lock()
      .unwrap()
      .push((frame.width(), frame.height(), result.clone()));
    Ok(())
  }
}
