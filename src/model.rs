// 该文件是 Gamji （감지） 项目的一部分。
// src/model.rs - 模型
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod config;
mod decode;
mod error;
mod onnx;
mod session;
mod tensor;

pub use self::config::{ConfigError, DetectorConfig, SuppressionMode};
pub use self::decode::{decode, iou, suppress};
pub use self::error::{DecodeError, InferError, LoadError};
pub use self::onnx::{OnnxModel, OnnxModelBuilder, preprocess};
pub use self::session::{DetectionSession, Diagnostic};
pub use self::tensor::{RawTensor, TensorLayout};

use crate::frame::BgrFrame;

/// COCO 数据集类别名称
pub const COCO_CLASSES: [&str; 80] = [
  "person",
  "bicycle",
  "car",
  "motorcycle",
  "airplane",
  "bus",
  "train",
  "truck",
  "boat",
  "traffic light",
  "fire hydrant",
  "stop sign",
  "parking meter",
  "bench",
  "bird",
  "cat",
  "dog",
  "horse",
  "sheep",
  "cow",
  "elephant",
  "bear",
  "zebra",
  "giraffe",
  "backpack",
  "umbrella",
  "handbag",
  "tie",
  "suitcase",
  "frisbee",
  "skis",
  "snowboard",
  "sports ball",
  "kite",
  "baseball bat",
  "baseball glove",
  "skateboard",
  "surfboard",
  "tennis racket",
  "bottle",
  "wine glass",
  "cup",
  "fork",
  "knife",
  "spoon",
  "bowl",
  "banana",
  "apple",
  "sandwich",
  "orange",
  "broccoli",
  "carrot",
  "hot dog",
  "pizza",
  "donut",
  "cake",
  "chair",
  "couch",
  "potted plant",
  "bed",
  "dining table",
  "toilet",
  "tv",
  "laptop",
  "mouse",
  "remote",
  "keyboard",
  "cell phone",
  "microwave",
  "oven",
  "toaster",
  "sink",
  "refrigerator",
  "book",
  "clock",
  "vase",
  "scissors",
  "teddy bear",
  "hair drier",
  "toothbrush",
];

pub fn class_label(class_id: usize) -> &'static str {
  COCO_CLASSES.get(class_id).copied().unwrap_or("unknown")
}

/// 推理后端
///
/// 同一实例同一时间只允许一次推理，因此 `infer` 需要独占借用。
pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error>;

  /// 模型的正方形输入边长
  fn input_size(&self) -> u32;
}

/// 按需加载模型，由检测会话在启用检测时调用
pub trait ModelLoader {
  type Model: Model<Input = BgrFrame, Output = RawTensor, Error = InferError>;

  fn load(&self) -> Result<Self::Model, LoadError>;
}

/// 检测结果，坐标为源图像像素坐标
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
  /// 边界框左上角 x 坐标
  pub x: f32,
  /// 边界框左上角 y 坐标
  pub y: f32,
  /// 边界框宽度
  pub width: f32,
  /// 边界框高度
  pub height: f32,
  /// 类别索引
  pub class_id: usize,
  /// 置信度 = objectness × 最佳类别分数
  pub score: f32,
}

impl Detection {
  pub fn right(&self) -> f32 {
    self.x + self.width
  }

  pub fn bottom(&self) -> f32 {
    self.y + self.height
  }

  pub fn area(&self) -> f32 {
    self.width * self.height
  }

  pub fn label(&self) -> &'static str {
    class_label(self.class_id)
  }
}

#[derive(Debug, Clone, Default)]
pub struct DetectResult {
  pub items: Box<[Detection]>,
  /// 推理或解码失败时的诊断信息，与“没有检测到目标”区分开
  pub diagnostic: Option<Diagnostic>,
}

impl DetectResult {
  pub fn new(items: Vec<Detection>) -> Self {
    Self {
      items: items.into_boxed_slice(),
      diagnostic: None,
    }
  }

  pub fn degraded(diagnostic: Diagnostic) -> Self {
    Self {
      items: Box::new([]),
      diagnostic: Some(diagnostic),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }
}
