// 该文件是 Gamji （감지） 项目的一部分。
// src/input.rs - 输入源定义
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod mailbox;
mod read_image_file;

use std::sync::{
  Arc, Mutex,
  atomic::{AtomicBool, AtomicU64, Ordering},
};

use tracing::trace;

use crate::frame::BgrFrame;

pub use mailbox::LatestFrame;
pub use read_image_file::{ImageFileInput, ImageFileInputError};

/// 帧到达回调，获得帧快照的所有权
///
/// 回调在分发器锁外执行，可以在回调内调用 `subscribe`/`unsubscribe`。
pub type FrameHandler = Box<dyn FnMut(BgrFrame) + Send>;

/// 帧源：在自己的采集上下文中把帧交给分发器
pub trait FrameSource {
  type Error;

  fn start(&mut self, dispatcher: Arc<FrameDispatcher>) -> Result<(), Self::Error>;

  /// 停止采集，已在分发中的帧允许完成
  fn stop(&mut self);

  fn width(&self) -> u32;

  fn height(&self) -> u32;

  /// 获取帧率（如果适用）
  fn fps(&self) -> Option<f64>;
}

#[derive(Default)]
struct Slot {
  handler: Option<FrameHandler>,
  // 每次订阅变更加一，回调执行期间发生变更时不再放回旧回调
  generation: u64,
}

/// 单订阅者的帧分发
///
/// 每个物理帧最多调用一次回调。回调仍在执行时到达的帧直接丢弃，不排队。
#[derive(Default)]
pub struct FrameDispatcher {
  slot: Mutex<Slot>,
  busy: AtomicBool,
  delivered: AtomicU64,
  dropped: AtomicU64,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
  fn drop(&mut self) {
    self.0.store(false, Ordering::Release);
  }
}

impl FrameDispatcher {
  pub fn new() -> Self {
    Self::default()
  }

  /// 注册回调，替换之前的回调
  pub fn subscribe(&self, handler: impl FnMut(BgrFrame) + Send + 'static) {
    self.replace(Some(Box::new(handler)));
  }

  pub fn unsubscribe(&self) {
    self.replace(None);
  }

  fn replace(&self, handler: Option<FrameHandler>) {
    let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
    slot.handler = handler;
    slot.generation += 1;
  }

  /// 分发一帧，返回是否送达
  pub fn dispatch(&self, frame: BgrFrame) -> bool {
    if self.busy.swap(true, Ordering::Acquire) {
      self.dropped.fetch_add(1, Ordering::Relaxed);
      trace!("回调仍在执行，丢弃一帧");
      return false;
    }
    let _busy = BusyGuard(&self.busy);

    let (handler, generation) = {
      let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
      (slot.handler.take(), slot.generation)
    };
    let Some(mut handler) = handler else {
      self.dropped.fetch_add(1, Ordering::Relaxed);
      return false;
    };

    handler(frame);
    self.delivered.fetch_add(1, Ordering::Relaxed);

    let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
    if slot.generation == generation {
      slot.handler = Some(handler);
    }
    true
  }

  pub fn delivered(&self) -> u64 {
    self.delivered.load(Ordering::Relaxed)
  }

  pub fn dropped(&self) -> u64 {
    self.dropped.load(Ordering::Relaxed)
  }
}

#[cfg(test)]
mod tests {
  use std::{sync::mpsc, thread};

  use super::*;

  fn pixel() -> BgrFrame {
    BgrFrame::filled(1, 1, [1, 2, 3])
  }

  #[test]
  fn frames_without_subscriber_are_dropped() {
    let dispatcher = FrameDispatcher::new();
    assert!(!dispatcher.dispatch(pixel()));
    assert_eq!(dispatcher.dropped(), 1);
  }

  #[test]
  fn subscriber_receives_ownership() {
    let dispatcher = FrameDispatcher::new();
    let (tx, rx) = mpsc::channel();
    dispatcher.subscribe(move |frame| tx.send(frame).unwrap());

    assert!(dispatcher.dispatch(pixel()));
    assert_eq!(rx.recv().unwrap(), pixel());
    assert_eq!(dispatcher.delivered(), 1);

    dispatcher.unsubscribe();
    assert!(!dispatcher.dispatch(pixel()));
  }

  #[test]
  fn busy_handler_drops_instead_of_queueing() {
    let dispatcher = Arc::new(FrameDispatcher::new());
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    dispatcher.subscribe(move |_frame| {
      entered_tx.send(()).unwrap();
      release_rx.recv().unwrap();
    });

    let worker = {
      let dispatcher = dispatcher.clone();
      thread::spawn(move || dispatcher.dispatch(pixel()))
    };
    entered_rx.recv().unwrap();

    assert!(!dispatcher.dispatch(pixel()));
    release_tx.send(()).unwrap();
    assert!(worker.join().unwrap());

    assert_eq!(dispatcher.delivered(), 1);
    assert_eq!(dispatcher.dropped(), 1);
  }

  #[test]
  fn handler_may_unsubscribe_itself() {
    let dispatcher = Arc::new(FrameDispatcher::new());
    let weak = Arc::downgrade(&dispatcher);
    dispatcher.subscribe(move |_frame| {
      if let Some(dispatcher) = weak.upgrade() {
        dispatcher.unsubscribe();
      }
    });

    assert!(dispatcher.dispatch(pixel()));
    assert!(!dispatcher.dispatch(pixel()));
    assert_eq!(dispatcher.delivered(), 1);
    assert_eq!(dispatcher.dropped(), 1);
  }

  #[test]
  fn handler_may_replace_itself() {
    let dispatcher = Arc::new(FrameDispatcher::new());
    let (tx, rx) = mpsc::channel();
    let weak = Arc::downgrade(&dispatcher);
    dispatcher.subscribe(move |_frame| {
      tx.send("first").unwrap();
      let tx = tx.clone();
      if let Some(dispatcher) = weak.upgrade() {
        dispatcher.subscribe(move |_frame| tx.send("second").unwrap());
      }
    });

    assert!(dispatcher.dispatch(pixel()));
    assert!(dispatcher.dispatch(pixel()));
    assert!(dispatcher.dispatch(pixel()));
    assert_eq!(rx.try_iter().collect::<Vec<_>>(), ["first", "second", "second"]);
  }
}
