// 该文件是 Gamji （감지） 项目的一部分。
// src/input/mailbox.rs - 最新帧单槽邮箱
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::sync::{Mutex, MutexGuard};

use crate::frame::BgrFrame;

/// 采集线程与界面刷新之间的“最新帧”交接
///
/// 写入方替换并丢弃旧帧，读取方克隆后立即释放锁。
#[derive(Debug, Default)]
pub struct LatestFrame {
  slot: Mutex<Option<BgrFrame>>,
}

impl LatestFrame {
  pub fn new() -> Self {
    Self::default()
  }

  // 槽内只有一个完整的帧或空，锁中毒时的数据仍然可用
  fn slot(&self) -> MutexGuard<'_, Option<BgrFrame>> {
    self.slot.lock().unwrap_or_else(|e| e.into_inner())
  }

  pub fn put(&self, frame: BgrFrame) {
    *self.slot() = Some(frame);
  }

  pub fn latest(&self) -> Option<BgrFrame> {
    self.slot().clone()
  }

  pub fn take(&self) -> Option<BgrFrame> {
    self.slot().take()
  }

  pub fn is_empty(&self) -> bool {
    self.slot().is_none()
  }
}
