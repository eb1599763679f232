// 该文件是 Gamji （감지） 项目的一部分。
// tests/tasks.rs - 任务循环集成测试
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod common;

use std::{
  sync::{atomic::Ordering, mpsc},
  thread,
  time::{Duration, Instant},
};

use gamji::{
  console::OperatorCommand,
  frame::BgrFrame,
  input::ImageFileInput,
  model::{DetectionSession, DetectorConfig},
  process::{FrameProcessor, ProcessorConfig},
  task::{LiveTask, OneShotTask, RepeatShotTask, Task},
};

use common::{CollectingOutput, ScriptedLoader, candidate, candidates_major};

fn person_session() -> DetectionSession<ScriptedLoader> {
  let raw = candidates_major(&[candidate(320.0, 320.0, 100.0, 100.0, 0.9, 0, 0.9)]);
  DetectionSession::new(ScriptedLoader::new(Ok(raw)), DetectorConfig::default()).unwrap()
}

fn replay(fps: f64) -> ImageFileInput {
  ImageFileInput::from_frame(BgrFrame::filled(640, 640, [30, 60, 90])).with_fps(fps)
}

#[test]
fn one_shot_renders_single_detection() {
  let output = CollectingOutput::default();
  OneShotTask::default()
    .run_task(replay(30.0), person_session(), output.clone())
    .unwrap();

  let results = output.results.lock().unwrap();
  assert_eq!(results.len(), 1);
  let (width, height, result) = &results[0];
  assert_eq!((*width, *height), (640, 640));
  assert_eq!(result.len(), 1);
  assert!((result.items[0].score - 0.81).abs() < 1e-6);
}

#[test]
fn one_shot_applies_processor_before_detection() {
  let output = CollectingOutput::default();
  let processor = FrameProcessor::new(ProcessorConfig::default().with_zoom(2));
  OneShotTask::default()
    .with_processor(processor)
    .run_task(replay(30.0), person_session(), output.clone())
    .unwrap();

  assert_eq!(output.results.lock().unwrap().len(), 1);
}

#[test]
fn repeat_shot_renders_every_round() {
  let output = CollectingOutput::default();
  RepeatShotTask::default()
    .with_repeat(5)
    .run_task(replay(30.0), person_session(), output.clone())
    .unwrap();

  assert_eq!(output.results.lock().unwrap().len(), 5);
}

#[test]
fn live_task_stops_at_frame_limit() {
  let output = CollectingOutput::default();
  LiveTask::default()
    .with_tick(Duration::from_millis(5))
    .with_frame_limit(Some(3))
    .with_interrupt_handler(false)
    .with_detect_on_start(true)
    .run_task(replay(200.0), person_session(), output.clone())
    .unwrap();

  let results = output.results.lock().unwrap();
  assert_eq!(results.len(), 3);
  assert!(results.iter().all(|(_, _, result)| result.len() == 1));
}

#[test]
fn live_task_without_detection_renders_empty_results() {
  let output = CollectingOutput::default();
  LiveTask::default()
    .with_tick(Duration::from_millis(5))
    .with_frame_limit(Some(2))
    .with_interrupt_handler(false)
    .run_task(replay(200.0), person_session(), output.clone())
    .unwrap();

  let results = output.results.lock().unwrap();
  assert_eq!(results.len(), 2);
  assert!(results.iter().all(|(_, _, result)| result.is_empty()));
}

#[test]
fn live_task_handles_operator_commands() {
  let snapshot_dir = std::env::temp_dir().join(format!("gamji-live-{}", std::process::id()));
  let (tx, rx) = mpsc::channel();
  let output = CollectingOutput::default();

  // 看到一次检测结果后再截图并退出
  let sender = {
    let results = output.results.clone();
    thread::spawn(move || {
      tx.send(OperatorCommand::ToggleDetect).unwrap();
      let deadline = Instant::now() + Duration::from_secs(30);
      while Instant::now() < deadline {
        if results.lock().unwrap().iter().any(|(_, _, result)| result.len() == 1) {
          break;
        }
        thread::sleep(Duration::from_millis(5));
      }
      tx.send(OperatorCommand::Snapshot).unwrap();
      tx.send(OperatorCommand::Quit).unwrap();
    })
  };

  LiveTask::default()
    .with_tick(Duration::from_millis(5))
    .with_interrupt_handler(false)
    .with_snapshot_dir(&snapshot_dir)
    .with_commands(rx)
    .run_task(replay(200.0), person_session(), output.clone())
    .unwrap();
  sender.join().unwrap();

  let snapshots = std::fs::read_dir(&snapshot_dir)
    .unwrap()
    .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
    .collect::<Vec<_>>();
  std::fs::remove_dir_all(&snapshot_dir).unwrap();
  assert_eq!(snapshots.len(), 1);
  assert!(snapshots[0].starts_with("snap_") && snapshots[0].ends_with(".png"));

  let results = output.results.lock().unwrap();
  assert!(results.iter().any(|(_, _, result)| result.len() == 1));
}

#[test]
fn live_task_stops_on_stop_handle() {
  let task = LiveTask::default()
    .with_tick(Duration::from_millis(5))
    .with_interrupt_handler(false);
  let stop = task.stop_handle();
  let stopper = thread::spawn(move || {
    thread::sleep(Duration::from_millis(50));
    stop.store(true, Ordering::Release);
  });

  task
    .run_task(replay(200.0), person_session(), CollectingOutput::default())
    .unwrap();
  stopper.join().unwrap();
}
