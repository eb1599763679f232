// 该文件是 Gamji （감지） 项目的一部分。
// src/model/onnx.rs - ONNX Runtime 推理适配
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use ort::{
  session::{Session, builder::GraphOptimizationLevel},
  value::Tensor,
};
use tracing::{debug, error, info, warn};

use crate::{
  frame::BgrFrame,
  model::{InferError, LoadError, Model, ModelLoader, RawTensor},
};

const ONNX_NUM_INPUTS: usize = 1;
const DEFAULT_INPUT_SIZE: u32 = 640;
const DEFAULT_INTRA_THREADS: usize = 4;

/// ONNX Runtime 报告模型文件本身无法解析时的错误片段
const CORRUPT_MODEL_MARKERS: [&str; 3] = [
  "Protobuf parsing failed",
  "INVALID_PROTOBUF",
  "INVALID_GRAPH",
];

pub struct OnnxModelBuilder {
  model_path: PathBuf,
  input_size: u32,
  intra_threads: usize,
}

impl OnnxModelBuilder {
  pub fn new(model_path: impl AsRef<Path>) -> Self {
    Self {
      model_path: model_path.as_ref().to_path_buf(),
      input_size: DEFAULT_INPUT_SIZE,
      intra_threads: DEFAULT_INTRA_THREADS,
    }
  }

  /// 模型声明动态输入尺寸时使用的边长
  pub fn input_size(mut self, input_size: u32) -> Self {
    self.input_size = input_size;
    self
  }

  pub fn intra_threads(mut self, intra_threads: usize) -> Self {
    self.intra_threads = intra_threads;
    self
  }

  pub fn model_path(&self) -> &Path {
    &self.model_path
  }

  fn rejected(&self, reason: impl ToString) -> LoadError {
    LoadError::BackendRejected {
      path: self.model_path.clone(),
      reason: reason.to_string(),
    }
  }

  pub fn build(&self) -> Result<OnnxModel, LoadError> {
    info!("加载模型文件: {}", self.model_path.display());
    if !self.model_path.is_file() {
      error!("模型文件不存在: {}", self.model_path.display());
      return Err(LoadError::NotFound(self.model_path.clone()));
    }

    let model_data = std::fs::read(&self.model_path).map_err(|e| LoadError::Corrupt {
      path: self.model_path.clone(),
      reason: e.to_string(),
    })?;
    if model_data.is_empty() {
      return Err(LoadError::Corrupt {
        path: self.model_path.clone(),
        reason: "文件为空".to_string(),
      });
    }
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    info!("创建 ONNX Runtime 推理会话");
    let session = Session::builder()
      .map_err(|e| self.rejected(e))?
      .with_optimization_level(GraphOptimizationLevel::Level3)
      .map_err(|e| self.rejected(e))?
      .with_intra_threads(self.intra_threads)
      .map_err(|e| self.rejected(e))?
      .commit_from_memory(&model_data)
      .map_err(|e| {
        let reason = e.to_string();
        error!("模型加载失败: {}", reason);
        if CORRUPT_MODEL_MARKERS.iter().any(|m| reason.contains(m)) {
          LoadError::Corrupt {
            path: self.model_path.clone(),
            reason,
          }
        } else {
          self.rejected(reason)
        }
      })?;

    let num_inputs = session.inputs.len();
    let num_outputs = session.outputs.len();
    debug!("模型输入数量: {}", num_inputs);
    debug!("模型输出数量: {}", num_outputs);

    if num_inputs != ONNX_NUM_INPUTS {
      return Err(self.rejected(format!(
        "预期模型输入数量为 {}, 实际为 {}",
        ONNX_NUM_INPUTS, num_inputs
      )));
    }
    if num_outputs == 0 {
      return Err(self.rejected("模型没有输出"));
    }

    let input_size = match declared_input_size(&session) {
      Some(size) => size,
      None => {
        warn!("模型未声明固定输入尺寸，使用配置值 {}", self.input_size);
        self.input_size
      }
    };
    info!("模型加载完成，输入尺寸 {}x{}", input_size, input_size);

    Ok(OnnxModel {
      session,
      input_size,
    })
  }
}

impl ModelLoader for OnnxModelBuilder {
  type Model = OnnxModel;

  fn load(&self) -> Result<Self::Model, LoadError> {
    self.build()
  }
}

/// 读取 NCHW 输入声明的正方形边长，动态维度返回 None
fn declared_input_size(session: &Session) -> Option<u32> {
  let input = session.inputs.first()?;
  let dims: &[i64] = input.input_type.tensor_shape()?;
  match *dims {
    [_, 3, h, w] if h == w && h > 0 => u32::try_from(h).ok(),
    _ => None,
  }
}

pub struct OnnxModel {
  session: Session,
  input_size: u32,
}

impl Model for OnnxModel {
  type Input = BgrFrame;
  type Output = RawTensor;
  type Error = InferError;

  fn infer(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    if input.is_empty() {
      return Err(InferError::EmptyFrame);
    }

    debug!("设置模型输入");
    let size = self.input_size as usize;
    let data = preprocess(input, self.input_size);
    let tensor = Tensor::from_array(([1usize, 3, size, size], data.into_boxed_slice()))?;

    debug!("执行模型推理");
    let outputs = self.session.run(ort::inputs![tensor])?;

    debug!("获取模型输出");
    if outputs.len() == 0 {
      return Err(InferError::NoOutput);
    }
    let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;
    let shape = shape.iter().map(|&d| d.max(0) as usize).collect::<Vec<_>>();
    RawTensor::new(shape, data.to_vec()).map_err(|e| InferError::Backend(e.to_string()))
  }

  fn input_size(&self) -> u32 {
    self.input_size
  }
}

/// 将 BGR 帧缩放到正方形输入，并转为 [0, 1] 范围的 RGB NCHW 数据
///
/// 模型按 RGB 训练，而相机交付的是 BGR，这里的通道交换不可省略。
pub fn preprocess(frame: &BgrFrame, input_size: u32) -> Vec<f32> {
  let rgb = frame.to_rgb_image();
  let resized = if rgb.dimensions() == (input_size, input_size) {
    rgb
  } else {
    imageops::resize(&rgb, input_size, input_size, FilterType::Triangle)
  };

  let plane = (input_size * input_size) as usize;
  let mut data = vec![0.0f32; 3 * plane];
  for (idx, pixel) in resized.pixels().enumerate() {
    for c in 0..3 {
      data[c * plane + idx] = pixel[c] as f32 / 255.0;
    }
  }
  data
}
