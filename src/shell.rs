// 该文件是 YoloDetector 项目的一部分。
// src/shell.rs - 交互界面状态
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
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use image::RgbImage;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
  frame::ChannelOrder,
  input::{ImageFileInput, ImageFileInputError},
  model::{DecodeResult, Detector, ModelDescriptor, ModelRegistry},
  output::Draw,
  task::{SingleSlot, TaskError},
};

pub const DEFAULT_THRESHOLD_PERCENT: u8 = 30;

#[derive(Error, Debug)]
pub enum ShellError {
  #[error("尚未打开图像")]
  NoImage,
  #[error("没有可用的模型")]
  NoModel,
  #[error("未知模型: {0}")]
  UnknownModel(String),
  #[error("正在检测，请稍候")]
  Busy,
  #[error("{0}")]
  Input(#[from] ImageFileInputError),
  #[error("无法启动检测: {0}")]
  Task(TaskError),
}

impl From<TaskError> for ShellError {
  fn from(err: TaskError) -> Self {
    match err {
      TaskError::Busy => ShellError::Busy,
      err => ShellError::Task(err),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
  Ready,
  Busy,
}

/// 一次后台检测结束后的通知
#[derive(Debug, Clone, PartialEq)]
pub enum ShellEvent {
  Completed { detections: usize, elapsed: Duration },
  Failed(String),
}

/// 界面绑定的全部状态与命令
///
/// 不依赖任何界面框架，命令行前端和测试都直接调用这里的方法。
pub struct Shell {
  registry: ModelRegistry,
  selected: Option<usize>,
  draw: Arc<Draw>,
  source: Option<Arc<RgbImage>>,
  file_path: Option<PathBuf>,
  result: Option<DecodeResult>,
  threshold_percent: u8,
  channel_order: ChannelOrder,
  status: Status,
  status_text: String,
  last_error: Option<String>,
  slot: SingleSlot<DecodeResult>,
}

impl Shell {
  pub fn new(registry: ModelRegistry, draw: Draw) -> Self {
    let selected = (!registry.is_empty()).then_some(0);
    Self {
      registry,
      selected,
      draw: Arc::new(draw),
      source: None,
      file_path: None,
      result: None,
      threshold_percent: DEFAULT_THRESHOLD_PERCENT,
      channel_order: ChannelOrder::default(),
      status: Status::Ready,
      status_text: "就绪".to_string(),
      last_error: None,
      slot: SingleSlot::new("find-objects"),
    }
  }

  /// 打开图像文件，失败时保留之前的图像与结果
  pub fn open_image<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ShellError> {
    if self.is_busy() {
      return Err(ShellError::Busy);
    }

    let path = path.as_ref();
    let input = match ImageFileInput::open(path) {
      Ok(input) => input,
      Err(err) => {
        warn!("无法打开图像 {}: {}", path.display(), err);
        self.report_error(err.to_string());
        return Err(err.into());
      }
    };

    info!("已打开图像 {}", path.display());
    self.file_path = Some(path.to_path_buf());
    self.source = Some(Arc::new(input.into_image()));
    self.result = None;
    self.last_error = None;
    self.status_text = "就绪".to_string();
    Ok(())
  }

  pub fn select_model(&mut self, name: &str) -> Result<&ModelDescriptor, ShellError> {
    let index = self
      .registry
      .position(name)
      .ok_or_else(|| ShellError::UnknownModel(name.to_string()))?;
    self.select_index(index)
  }

  pub fn select_index(&mut self, index: usize) -> Result<&ModelDescriptor, ShellError> {
    let model = self
      .registry
      .get(index)
      .ok_or_else(|| ShellError::UnknownModel(index.to_string()))?;
    info!("选择模型 {}", model.name());
    self.selected = Some(index);
    Ok(model)
  }

  /// 设置检测阈值百分比，超过 100 的值按 100 处理
  pub fn set_threshold_percent(&mut self, percent: u8) {
    self.threshold_percent = percent.min(100);
  }

  /// 网络输入的通道顺序，默认 RGB
  pub fn set_channel_order(&mut self, order: ChannelOrder) {
    self.channel_order = order;
  }

  pub fn can_find_objects(&self) -> bool {
    self.source.is_some() && self.selected.is_some() && !self.is_busy()
  }

  /// 在后台对当前图像执行检测
  pub fn find_objects(&mut self) -> Result<(), ShellError> {
    if self.is_busy() {
      return Err(ShellError::Busy);
    }
    let image = self.source.clone().ok_or(ShellError::NoImage)?;
    let model = self.selected_model().ok_or(ShellError::NoModel)?;

    let detector = Detector::new(model, self.draw.clone()).with_channel_order(self.channel_order);
    let threshold = f32::from(self.threshold_percent) / 100.0;
    info!("使用模型 {} 检测，阈值 {}%", model.name(), self.threshold_percent);

    self
      .slot
      .submit(move || Ok(detector.find_objects(&image, threshold)?))?;
    self.status = Status::Busy;
    self.status_text = "正在检测...".to_string();
    Ok(())
  }

  /// 取回已完成的检测结果，未完成时返回 `None`
  pub fn poll(&mut self) -> Option<ShellEvent> {
    let result = self.slot.poll()?;
    Some(self.finish(result))
  }

  /// 阻塞等待当前检测完成
  pub fn wait(&mut self) -> Option<ShellEvent> {
    let result = self.slot.wait()?;
    Some(self.finish(result))
  }

  /// 关闭前等待仍在执行的检测
  pub fn close(mut self) {
    if let Some(event) = self.wait() {
      info!("关闭前完成检测: {:?}", event);
    }
  }

  fn finish(&mut self, result: anyhow::Result<DecodeResult>) -> ShellEvent {
    self.status = Status::Ready;
    match result {
      Ok(result) => {
        let event = ShellEvent::Completed {
          detections: result.items.len(),
          elapsed: result.elapsed,
        };
        self.status_text = format!("完成，检测到 {} 个目标", result.items.len());
        self.last_error = None;
        self.result = Some(result);
        event
      }
      Err(err) => {
        let message = err.root_cause().to_string();
        warn!("检测失败: {:#}", err);
        self.report_error(message.clone());
        ShellEvent::Failed(message)
      }
    }
  }

  fn report_error(&mut self, message: String) {
    self.status_text = message.clone();
    self.last_error = Some(message);
  }

  pub fn models(&self) -> &[ModelDescriptor] {
    self.registry.models()
  }

  pub fn selected_model(&self) -> Option<&ModelDescriptor> {
    self.selected.and_then(|index| self.registry.get(index))
  }

  pub fn selected_index(&self) -> Option<usize> {
    self.selected
  }

  /// 当前显示的图像：有检测结果时为标注图，否则为原图
  pub fn image(&self) -> Option<&RgbImage> {
    self
      .result
      .as_ref()
      .map(|result| &result.image)
      .or(self.source.as_deref())
  }

  pub fn source_image(&self) -> Option<&RgbImage> {
    self.source.as_deref()
  }

  pub fn file_path(&self) -> Option<&Path> {
    self.file_path.as_deref()
  }

  pub fn result(&self) -> Option<&DecodeResult> {
    self.result.as_ref()
  }

  pub fn threshold_percent(&self) -> u8 {
    self.threshold_percent
  }

  pub fn channel_order(&self) -> ChannelOrder {
    self.channel_order
  }

  pub fn status(&self) -> Status {
    self.status
  }

  pub fn status_text(&self) -> &str {
    &self.status_text
  }

  pub fn is_busy(&self) -> bool {
    self.slot.is_busy()
  }

  pub fn runtime(&self) -> Option<Duration> {
    self.result.as_ref().map(|result| result.elapsed)
  }

  pub fn runtime_text(&self) -> String {
    self
      .result
      .as_ref()
      .map(|result| format!("{} ms", result.elapsed_ms()))
      .unwrap_or_default()
  }

  pub fn detections(&self) -> Vec<String> {
    self
      .result
      .as_ref()
      .map(DecodeResult::lines)
      .unwrap_or_default()
  }

  pub fn last_error(&self) -> Option<&str> {
    self.last_error.as_deref()
  }

  pub fn about() -> String {
    format!(
      "{} {}\n{}",
      env!("CARGO_PKG_NAME"),
      env!("CARGO_PKG_VERSION"),
      env!("CARGO_PKG_DESCRIPTION")
    )
  }
}
