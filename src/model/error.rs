// 该文件是 Gamji （감지） 项目的一部分。
// src/model/error.rs - 检测子系统错误定义
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use thiserror::Error;

/// 模型加载错误，需要直接呈现给操作员
#[derive(Error, Debug)]
pub enum LoadError {
  #[error("模型文件不存在: {0}")]
  NotFound(PathBuf),
  #[error("模型文件无法解析: {path}, 原因: {reason}")]
  Corrupt { path: PathBuf, reason: String },
  #[error("推理后端拒绝了模型: {path}, 原因: {reason}")]
  BackendRejected { path: PathBuf, reason: String },
}

/// 单帧推理错误，该帧视为没有检测结果
#[derive(Error, Debug)]
pub enum InferError {
  #[error("输入帧为空")]
  EmptyFrame,
  #[error("推理后端错误: {0}")]
  Backend(String),
  #[error("模型没有输出")]
  NoOutput,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
  #[error("输出张量布局不符: 形状 {shape:?}, 期望某一尾部维度为 {channels}")]
  UnexpectedLayout { shape: Vec<usize>, channels: usize },
  #[error("张量形状 {shape:?} 与数据长度 {len} 不一致")]
  ShapeMismatch { shape: Vec<usize>, len: usize },
}

impl From<ort::Error> for InferError {
  fn from(err: ort::Error) -> Self {
    InferError::Backend(err.to_string())
  }
}
