// 该文件是 Gamji （감지） 项目的一部分。
// src/output/log_output.rs - 日志输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::BgrFrame,
  model::{DetectResult, Diagnostic},
  output::Render,
};

#[derive(Error, Debug)]
pub enum LogOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

/// 只把检测结果写入日志，不产生文件
///
/// `log:` 或 `log:?empty` （同时记录空结果）
#[derive(Debug, Default)]
pub struct LogOutput {
  log_empty: bool,
}

impl FromUrlWithScheme for LogOutput {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogOutput {
  type Error = LogOutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(LogOutputError::SchemeMismatch);
    }

    Ok(LogOutput {
      log_empty: uri.query_pairs().any(|(k, _)| k == "empty"),
    })
  }
}

impl Render<BgrFrame, DetectResult> for LogOutput {
  type Error = LogOutputError;

  fn render_result(&self, frame: &BgrFrame, result: &DetectResult) -> Result<(), Self::Error> {
    match &result.diagnostic {
      Some(Diagnostic::InferFailed(reason)) => warn!("推理失败: {}", reason),
      Some(Diagnostic::IncompatibleModel { shape }) => {
        warn!("模型输出不兼容: {:?}，检测已关闭", shape)
      }
      None if result.is_empty() && !self.log_empty => {}
      None => info!(
        "帧 {}x{}: 检测到 {} 个对象",
        frame.width(),
        frame.height(),
        result.len()
      ),
    }

    for item in result.items.iter() {
      info!(
        "  - {}: {:.2}% at ({:.0}, {:.0}, {:.0}x{:.0})",
        item.label(),
        item.score * 100.0,
        item.x,
        item.y,
        item.width,
        item.height
      );
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_flag() {
    let output = LogOutput::from_url(&Url::parse("log:?empty").unwrap()).unwrap();
    assert!(output.log_empty);
    assert!(LogOutput::from_url(&Url::parse("image:///a.png").unwrap()).is_err());
  }

  #[test]
  fn renders_degraded_result() {
    let output = LogOutput::default();
    let result = DetectResult::degraded(Diagnostic::IncompatibleModel {
      shape: vec![1, 40, 40],
    });
    assert!(
      output
        .render_result(&BgrFrame::filled(2, 2, [0, 0, 0]), &result)
        .is_ok()
    );
  }
}
