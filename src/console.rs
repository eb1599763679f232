// 该文件是 Gamji （감지） 项目的一部分。
// src/console.rs - 操作员命令
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{
  io::{BufRead, BufReader, Read},
  str::FromStr,
  sync::mpsc::{self, Receiver},
  thread,
};

use thiserror::Error;
use tracing::{debug, warn};

/// 实时任务中操作员可下达的命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
  /// 保存当前原始帧
  Snapshot,
  /// 开始或停止录像
  ToggleRecord,
  /// 开启或关闭检测，开启时加载模型
  ToggleDetect,
  /// 重新加载模型
  ReloadModel,
  Quit,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("未知命令: {0}")]
pub struct UnknownCommand(pub String);

impl FromStr for OperatorCommand {
  type Err = UnknownCommand;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "s" | "snap" | "snapshot" => Ok(Self::Snapshot),
      "r" | "rec" | "record" => Ok(Self::ToggleRecord),
      "d" | "detect" => Ok(Self::ToggleDetect),
      "l" | "reload" => Ok(Self::ReloadModel),
      "q" | "quit" | "exit" => Ok(Self::Quit),
      other => Err(UnknownCommand(other.to_string())),
    }
  }
}

impl OperatorCommand {
  pub const HELP: &'static str = "s: 快照  r: 录像开关  d: 检测开关  l: 重新加载模型  q: 退出";
}

/// 在后台线程逐行读取命令
///
/// 读取端关闭（EOF）后线程退出，接收端随后收到断开。
pub fn spawn_reader<R: Read + Send + 'static>(reader: R) -> Receiver<OperatorCommand> {
  let (tx, rx) = mpsc::channel();
  let spawned = thread::Builder::new()
    .name("console".into())
    .spawn(move || {
      for line in BufReader::new(reader).lines() {
        let line = match line {
          Ok(line) => line,
          Err(e) => {
            warn!("读取命令失败: {}", e);
            break;
          }
        };
        if line.trim().is_empty() {
          continue;
        }
        match line.parse::<OperatorCommand>() {
          Ok(command) => {
            debug!("收到命令: {:?}", command);
            if tx.send(command).is_err() {
              break;
            }
          }
          Err(e) => warn!("{}，可用命令: {}", e, OperatorCommand::HELP),
        }
      }
    });
  if let Err(e) = spawned {
    warn!("无法启动命令读取线程: {}", e);
  }
  rx
}

#[cfg(test)]
mod tests {
  use std::io::Cursor;

  use super::*;

  #[test]
  fn parses_short_and_long_forms() {
    assert_eq!("s".parse(), Ok(OperatorCommand::Snapshot));
    assert_eq!(" Record \n".parse(), Ok(OperatorCommand::ToggleRecord));
    assert_eq!("detect".parse(), Ok(OperatorCommand::ToggleDetect));
    assert_eq!("l".parse(), Ok(OperatorCommand::ReloadModel));
    assert_eq!("QUIT".parse(), Ok(OperatorCommand::Quit));
    assert_eq!(
      "zoom".parse::<OperatorCommand>(),
      Err(UnknownCommand("zoom".into()))
    );
  }

  #[test]
  fn reader_skips_unknown_lines() {
    let rx = spawn_reader(Cursor::new("s\n\nbogus\nd\nq\n"));
    let commands = rx.iter().collect::<Vec<_>>();
    assert_eq!(
      commands,
      vec![
        OperatorCommand::Snapshot,
        OperatorCommand::ToggleDetect,
        OperatorCommand::Quit
      ]
    );
  }
}
