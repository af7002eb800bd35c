// 该文件是 YoloDetector 项目的一部分。
// src/task.rs - 单槽后台任务
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
  any::Any,
  panic::{self, AssertUnwindSafe},
  sync::mpsc::{self, Receiver, TryRecvError},
  thread,
  time::Instant,
};

use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum TaskError {
  #[error("已有任务正在执行")]
  Busy,
  #[error("无法创建后台线程: {0}")]
  Spawn(#[from] std::io::Error),
}

/// 同一时刻最多执行一个后台任务
///
/// 任务在独立线程中运行，结果通过通道送回，调用方用 `poll` 或 `wait` 取回。
/// 任务中的 panic 会被捕获并转换为错误。
pub struct SingleSlot<T> {
  name: String,
  pending: Option<Receiver<anyhow::Result<T>>>,
}

impl<T: Send + 'static> SingleSlot<T> {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      pending: None,
    }
  }

  pub fn is_busy(&self) -> bool {
    self.pending.is_some()
  }

  pub fn submit<F>(&mut self, job: F) -> Result<(), TaskError>
  where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
  {
    if self.is_busy() {
      warn!("任务 {} 仍在执行，拒绝新的提交", self.name);
      return Err(TaskError::Busy);
    }

    let (tx, rx) = mpsc::channel();
    let name = self.name.clone();
    thread::Builder::new()
      .name(self.name.clone())
      .spawn(move || {
        info!("开始任务 {}...", name);
        let now = Instant::now();
        let result = match panic::catch_unwind(AssertUnwindSafe(job)) {
          Ok(result) => result,
          Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!("任务 {} 发生 panic: {}", name, message);
            Err(anyhow::anyhow!(message))
          }
        };
        info!("任务 {} 结束，耗时: {:.2?}", name, now.elapsed());
        // 接收端已被丢弃时结果无人关心
        let _ = tx.send(result);
      })?;

    self.pending = Some(rx);
    Ok(())
  }

  /// 非阻塞地取回结果，任务未完成时返回 `None`
  pub fn poll(&mut self) -> Option<anyhow::Result<T>> {
    let rx = self.pending.as_ref()?;
    let result = match rx.try_recv() {
      Ok(result) => result,
      Err(TryRecvError::Empty) => return None,
      Err(TryRecvError::Disconnected) => Err(anyhow::anyhow!("后台任务 {} 意外退出", self.name)),
    };
    self.pending = None;
    debug!("任务 {} 的结果已取回", self.name);
    Some(result)
  }

  /// 阻塞直到当前任务完成，空闲时返回 `None`
  pub fn wait(&mut self) -> Option<anyhow::Result<T>> {
    let rx = self.pending.take()?;
    Some(
      rx.recv()
        .unwrap_or_else(|_| Err(anyhow::anyhow!("后台任务 {} 意外退出", self.name))),
    )
  }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(message) = payload.downcast_ref::<&str>() {
    message.to_string()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "未知 panic".to_string()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::{sync::mpsc, time::Duration};

  #[test]
  fn delivers_result() {
    let mut slot = SingleSlot::new("test");
    slot.submit(|| Ok(21 * 2)).unwrap();
    assert!(slot.is_busy());
    assert_eq!(slot.wait().unwrap().unwrap(), 42);
    assert!(!slot.is_busy());
    assert!(slot.wait().is_none());
  }

  #[test]
  fn rejects_second_job_while_busy() {
    let (release, gate) = mpsc::channel::<()>();
    let mut slot = SingleSlot::new("test");
    slot
      .submit(move || {
        gate.recv()?;
        Ok(1)
      })
      .unwrap();

    assert!(matches!(slot.submit(|| Ok(2)), Err(TaskError::Busy)));
    assert!(slot.poll().is_none());

    release.send(()).unwrap();
    assert_eq!(slot.wait().unwrap().unwrap(), 1);
    slot.submit(|| Ok(3)).unwrap();
    assert_eq!(slot.wait().unwrap().unwrap(), 3);
  }

  #[test]
  fn poll_eventually_returns_result() {
    let mut slot = SingleSlot::new("test");
    slot.submit(|| Ok("done")).unwrap();

    let result = loop {
      if let Some(result) = slot.poll() {
        break result;
      }
      thread::sleep(Duration::from_millis(1));
    };
    assert_eq!(result.unwrap(), "done");
    assert!(!slot.is_busy());
  }

  #[test]
  fn panic_becomes_error_and_frees_slot() {
    let mut slot: SingleSlot<u32> = SingleSlot::new("test");
    slot.submit(|| panic!("boom")).unwrap();

    let err = slot.wait().unwrap().unwrap_err();
    assert_eq!(err.to_string(), "boom");
    assert!(!slot.is_busy());
    assert!(slot.submit(|| Ok(7)).is_ok());
  }

  #[test]
  fn job_error_is_returned() {
    let mut slot: SingleSlot<u32> = SingleSlot::new("test");
    slot.submit(|| Err(anyhow::anyhow!("bad input"))).unwrap();
    assert_eq!(slot.wait().unwrap().unwrap_err().to_string(), "bad input");
  }
}
