// 该文件是 Gamji （감지） 项目的一部分。
// src/task.rs - 任务循环（单次、重复、实时）
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::{
  path::PathBuf,
  sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
    mpsc::Receiver,
  },
  thread::{self, JoinHandle},
  time::{Duration, Instant},
};

use anyhow::Context;
use tracing::{error, info, warn};

use crate::{
  console::OperatorCommand,
  frame::BgrFrame,
  input::{FrameDispatcher, FrameSource, LatestFrame},
  model::{DetectResult, DetectionSession, Diagnostic, ModelLoader},
  output::{Render, VideoRecorder, save_snapshot},
  process::FrameProcessor,
};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

fn report_diagnostic(result: &DetectResult) {
  match &result.diagnostic {
    Some(Diagnostic::InferFailed(reason)) => warn!("本帧推理失败: {}", reason),
    Some(Diagnostic::IncompatibleModel { shape }) => {
      error!("模型输出形状 {:?} 无法解码，检测已关闭，请重新加载模型", shape)
    }
    None => {}
  }
}

#[derive(Debug, Default)]
pub struct OneShotTask {
  processor: FrameProcessor,
}

impl OneShotTask {
  pub fn with_processor(mut self, processor: FrameProcessor) -> Self {
    self.processor = processor;
    self
  }
}

impl<
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = BgrFrame>,
  L: ModelLoader,
  O: Render<BgrFrame, DetectResult, Error = RE>,
> Task<I, DetectionSession<L>, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(
    self,
    mut input: I,
    mut model: DetectionSession<L>,
    output: O,
  ) -> Result<(), Self::Error> {
    info!("开始任务...");
    model.enable().context("模型加载失败")?;
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始推理...");

    let now = Instant::now();
    let frame = self.processor.run(&frame);
    let result = model.detect(&frame);
    let elapsed = now.elapsed();
    report_diagnostic(&result);
    info!("推理完成，检测到 {} 个对象，耗时: {:.2?}", result.len(), elapsed);

    output.render_result(&frame, &result)?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    Ok(())
  }
}

/// 对同一帧重复推理，统计平均耗时
#[derive(Debug)]
pub struct RepeatShotTask {
  repeat: usize,
  warmup: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self {
      repeat: 100,
      warmup: 2,
    }
  }
}

impl RepeatShotTask {
  pub fn with_repeat(mut self, repeat: usize) -> Self {
    self.repeat = repeat.max(1);
    self
  }

  pub fn with_warmup(mut self, warmup: usize) -> Self {
    self.warmup = warmup;
    self
  }

  /// 平均耗时，预热轮次不计入；总轮次不足时全部计入
  pub fn average(&self, times: &[Duration]) -> Duration {
    let measured = if times.len() > self.warmup {
      &times[self.warmup..]
    } else {
      times
    };
    match measured.len() {
      0 => Duration::ZERO,
      n => measured.iter().sum::<Duration>() / n as u32,
    }
  }
}

impl<
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = BgrFrame>,
  L: ModelLoader,
  O: Render<BgrFrame, DetectResult, Error = RE>,
> Task<I, DetectionSession<L>, O> for RepeatShotTask
{
  type Error = anyhow::Error;

  fn run_task(
    self,
    mut input: I,
    mut model: DetectionSession<L>,
    output: O,
  ) -> Result<(), Self::Error> {
    info!("开始任务...");
    model.enable().context("模型加载失败")?;
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始推理...");

    let mut times = Vec::with_capacity(self.repeat);
    for i in 0..self.repeat {
      let now = Instant::now();
      let result = model.detect(&frame);
      let elapsed = now.elapsed();
      report_diagnostic(&result);
      info!("({})推理完成，耗时: {:.2?}", i, elapsed);
      output.render_result(&frame, &result)?;
      times.push(elapsed);
    }

    warn!("平均推理时间: {:.2?}", self.average(&times));

    Ok(())
  }
}

/// 实时任务
///
/// 采集线程把帧放入最新帧邮箱（录像时同时写入录像器），主循环按固定间隔
/// 取出最新帧，经过预处理与检测后交给输出。Ctrl-C 或操作员命令结束循环。
pub struct LiveTask {
  processor: FrameProcessor,
  tick: Duration,
  frame_limit: Option<usize>,
  snapshot_dir: PathBuf,
  record_dir: PathBuf,
  detect_on_start: bool,
  handle_interrupt: bool,
  commands: Option<Receiver<OperatorCommand>>,
  stop: Arc<AtomicBool>,
}

impl Default for LiveTask {
  fn default() -> Self {
    Self {
      processor: FrameProcessor::default(),
      tick: Duration::from_millis(100),
      frame_limit: None,
      snapshot_dir: PathBuf::from("."),
      record_dir: PathBuf::from("."),
      detect_on_start: false,
      handle_interrupt: true,
      commands: None,
      stop: Arc::new(AtomicBool::new(false)),
    }
  }
}

impl LiveTask {
  pub fn with_processor(mut self, processor: FrameProcessor) -> Self {
    self.processor = processor;
    self
  }

  pub fn with_tick(mut self, tick: Duration) -> Self {
    self.tick = tick;
    self
  }

  pub fn with_frame_limit(mut self, frame_limit: Option<usize>) -> Self {
    self.frame_limit = frame_limit;
    self
  }

  pub fn with_snapshot_dir(mut self, directory: impl Into<PathBuf>) -> Self {
    self.snapshot_dir = directory.into();
    self
  }

  pub fn with_record_dir(mut self, directory: impl Into<PathBuf>) -> Self {
    self.record_dir = directory.into();
    self
  }

  pub fn with_detect_on_start(mut self, detect_on_start: bool) -> Self {
    self.detect_on_start = detect_on_start;
    self
  }

  /// 是否安装 Ctrl-C 处理（每个进程只能安装一次）
  pub fn with_interrupt_handler(mut self, handle_interrupt: bool) -> Self {
    self.handle_interrupt = handle_interrupt;
    self
  }

  pub fn with_commands(mut self, commands: Receiver<OperatorCommand>) -> Self {
    self.commands = Some(commands);
    self
  }

  /// 置位后主循环在下一个周期退出
  pub fn stop_handle(&self) -> Arc<AtomicBool> {
    self.stop.clone()
  }

  fn install_interrupt_handler(&self) -> anyhow::Result<()> {
    let stop = self.stop.clone();
    ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      stop.store(true, Ordering::Release);
      thread::spawn(|| {
        thread::sleep(Duration::from_secs(30));
        warn!("强制退出程序");
        std::process::exit(1);
      });
    })
    .context("无法设置 Ctrl-C 处理")
  }
}

type SharedRecorder = Arc<Mutex<Option<VideoRecorder>>>;

/// 在后台线程编码快照，避免阻塞刷新周期
fn spawn_snapshot(directory: PathBuf, frame: BgrFrame) -> JoinHandle<()> {
  thread::spawn(move || match save_snapshot(&directory, &frame) {
    Ok(path) => info!("快照已保存: {}", path.display()),
    Err(e) => error!("保存快照失败: {}", e),
  })
}

fn stop_recording(recording: &SharedRecorder) {
  let recorder = recording
    .lock()
    .unwrap_or_else(PoisonError::into_inner)
    .take();
  if let Some(recorder) = recorder {
    match recorder.finish() {
      Ok(()) => info!("录像结束: {}", recorder.path().display()),
      Err(e) => error!("完成录像时出错: {}", e),
    }
  }
}

impl<
  IE: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: FrameSource<Error = IE>,
  L: ModelLoader,
  O: Render<BgrFrame, DetectResult, Error = RE>,
> Task<I, DetectionSession<L>, O> for LiveTask
{
  type Error = anyhow::Error;

  fn run_task(
    self,
    mut input: I,
    mut model: DetectionSession<L>,
    output: O,
  ) -> Result<(), Self::Error> {
    info!("开始任务...");
    if self.handle_interrupt {
      self.install_interrupt_handler()?;
    }

    if self.detect_on_start
      && let Err(e) = model.enable()
    {
      error!("模型加载失败，检测保持关闭: {}", e);
    }

    let mailbox = Arc::new(LatestFrame::new());
    let recording: SharedRecorder = Arc::new(Mutex::new(None));
    let dispatcher = Arc::new(FrameDispatcher::new());
    {
      let mailbox = mailbox.clone();
      let recording = recording.clone();
      dispatcher.subscribe(move |frame| {
        if let Some(recorder) = recording
          .lock()
          .unwrap_or_else(PoisonError::into_inner)
          .as_ref()
          && let Err(e) = recorder.write_frame(&frame)
        {
          warn!("写入录像失败: {}", e);
        }
        mailbox.put(frame);
      });
    }

    input.start(dispatcher.clone())?;
    let record_fps = input.fps().unwrap_or(30.0);
    info!(
      "输入源已启动: {}x{}，刷新间隔 {:.2?}",
      input.width(),
      input.height(),
      self.tick
    );

    let mut snapshots: Vec<JoinHandle<()>> = Vec::new();
    let mut last_delivered = 0;
    let mut processed = 0usize;
    let mut window_frames = 0u32;
    let mut window_start = Instant::now();

    let outcome = loop {
      if self.stop.load(Ordering::Acquire) {
        warn!("中断信号接收，退出任务循环");
        break Ok(());
      }

      let mut quit = false;
      if let Some(commands) = self.commands.as_ref() {
        while let Ok(command) = commands.try_recv() {
          match command {
            OperatorCommand::Snapshot => match mailbox.latest() {
              Some(frame) => {
                snapshots.retain(|handle| !handle.is_finished());
                snapshots.push(spawn_snapshot(self.snapshot_dir.clone(), frame));
              }
              None => warn!("还没有收到帧，无法保存快照"),
            },
            OperatorCommand::ToggleRecord => {
              let active = recording
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .is_some();
              if active {
                stop_recording(&recording);
              } else {
                let recorder = VideoRecorder::timestamped(&self.record_dir, record_fps);
                info!("开始录像: {}", recorder.path().display());
                *recording.lock().unwrap_or_else(PoisonError::into_inner) = Some(recorder);
              }
            }
            OperatorCommand::ToggleDetect => match model.toggle() {
              Ok(enabled) => info!("检测已{}", if enabled { "开启" } else { "关闭" }),
              Err(e) => error!("模型加载失败，检测保持关闭: {}", e),
            },
            OperatorCommand::ReloadModel => match model.reload() {
              Ok(()) => info!("模型已重新加载"),
              Err(e) => error!("模型重新加载失败: {}", e),
            },
            OperatorCommand::Quit => quit = true,
          }
        }
      }
      if quit {
        info!("操作员退出");
        break Ok(());
      }

      thread::sleep(self.tick);

      let delivered = dispatcher.delivered();
      if delivered == last_delivered {
        continue;
      }
      last_delivered = delivered;
      let Some(frame) = mailbox.latest() else {
        continue;
      };

      let frame = self.processor.run(&frame);
      let result = if model.is_enabled() {
        model.detect(&frame)
      } else {
        DetectResult::default()
      };
      report_diagnostic(&result);

      if let Err(e) = output.render_result(&frame, &result) {
        break Err(anyhow::Error::from(e).context("输出失败"));
      }

      processed += 1;
      window_frames += 1;
      let elapsed = window_start.elapsed();
      if elapsed >= Duration::from_secs(1) {
        info!("FPS: {:.1}", window_frames as f64 / elapsed.as_secs_f64());
        window_frames = 0;
        window_start = Instant::now();
      }

      if self.frame_limit.is_some_and(|n| processed >= n) {
        info!("达到指定帧数 {}, 退出任务循环", processed);
        break Ok(());
      }
    };

    input.stop();
    dispatcher.unsubscribe();
    stop_recording(&recording);
    for handle in snapshots {
      if handle.join().is_err() {
        error!("快照线程异常退出");
      }
    }

    info!(
      "任务完成，处理 {} 帧，接收 {} 帧，丢弃 {} 帧",
      processed,
      dispatcher.delivered(),
      dispatcher.dropped()
    );
    outcome
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn average_skips_warmup() {
    let task = RepeatShotTask::default();
    let times = [100, 50, 10, 20].map(Duration::from_millis);
    assert_eq!(task.average(&times), Duration::from_millis(15));
  }

  #[test]
  fn average_with_few_samples_uses_all() {
    let task = RepeatShotTask::default().with_warmup(5);
    let times = [10, 20].map(Duration::from_millis);
    assert_eq!(task.average(&times), Duration::from_millis(15));
    assert_eq!(task.average(&[]), Duration::ZERO);
  }
}
