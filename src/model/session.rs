// 该文件是 Gamji （감지） 项目的一部分。
// src/model/session.rs - 检测会话
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

//! 检测子系统的边界。
//!
//! 实时视频中单帧的失败不能阻塞采集和显示，因此推理错误和解码错误
//! 在这里降级为空结果并附带诊断信息；只有模型加载错误会返回给调用方。
//! 输出布局不兼容说明模型与解码器不匹配，重试没有意义，
//! 会话会停用检测，直到重新加载模型。

use tracing::{debug, error, info, warn};

use crate::{
  frame::BgrFrame,
  model::{
    ConfigError, DetectResult, DetectorConfig, InferError, LoadError, Model, ModelLoader, decode,
  },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
  /// 推理后端执行失败，本帧没有结果
  InferFailed(String),
  /// 输出张量形状与解码器不兼容，检测已停用
  IncompatibleModel { shape: Vec<usize> },
}

pub struct DetectionSession<L: ModelLoader> {
  loader: L,
  config: DetectorConfig,
  model: Option<L::Model>,
  enabled: bool,
}

impl<L: ModelLoader> DetectionSession<L> {
  pub fn new(loader: L, config: DetectorConfig) -> Result<Self, ConfigError> {
    config.validate()?;
    Ok(Self {
      loader,
      config,
      model: None,
      enabled: false,
    })
  }

  pub fn config(&self) -> &DetectorConfig {
    &self.config
  }

  /// 模型是否已加载
  pub fn is_ready(&self) -> bool {
    self.model.is_some()
  }

  pub fn is_enabled(&self) -> bool {
    self.enabled
  }

  /// 启用检测，模型尚未加载时先加载
  pub fn enable(&mut self) -> Result<(), LoadError> {
    if self.model.is_none() {
      self.model = Some(self.loader.load()?);
    }
    self.enabled = true;
    info!("检测已启用");
    Ok(())
  }

  pub fn disable(&mut self) {
    self.enabled = false;
    info!("检测已停用");
  }

  /// 切换检测状态，返回切换后是否启用
  pub fn toggle(&mut self) -> Result<bool, LoadError> {
    if self.enabled {
      self.disable();
    } else {
      self.enable()?;
    }
    Ok(self.enabled)
  }

  /// 丢弃当前模型并重新加载，成功后启用检测
  pub fn reload(&mut self) -> Result<(), LoadError> {
    self.model = None;
    self.enabled = false;
    self.enable()
  }

  pub fn detect(&mut self, frame: &BgrFrame) -> DetectResult {
    if !self.enabled {
      return DetectResult::default();
    }
    let Some(model) = self.model.as_mut() else {
      return DetectResult::default();
    };
    if frame.is_empty() {
      debug!("输入帧为空，跳过检测");
      return DetectResult::default();
    }

    let raw = match model.infer(frame) {
      Ok(raw) => raw,
      Err(InferError::EmptyFrame) => return DetectResult::default(),
      Err(e) => {
        warn!("推理失败，跳过本帧: {}", e);
        return DetectResult::degraded(Diagnostic::InferFailed(e.to_string()));
      }
    };

    let config = self.config.clone().with_input_size(model.input_size());
    match decode(&raw, frame.width(), frame.height(), &config) {
      Ok(items) => DetectResult::new(items),
      Err(e) => {
        error!("模型输出与解码器不兼容，停用检测直到重新加载模型: {}", e);
        self.enabled = false;
        self.model = None;
        DetectResult::degraded(Diagnostic::IncompatibleModel {
          shape: raw.shape().to_vec(),
        })
      }
    }
  }
}
