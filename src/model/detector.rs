// 该文件是 YoloDetector 项目的一部分。
// src/model/detector.rs - 单张图像检测流程
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

use std::{sync::Arc, time::Instant};

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
  frame::{ChannelOrder, NchwBlob},
  model::{
    DecodeError, DecodeResult, EngineError, LabelSet, ModelDescriptor, SharedEngine,
    decode_detections,
  },
  output::Draw,
};

#[derive(Error, Debug)]
pub enum DetectError {
  #[error("推理引擎错误: {0}")]
  EngineError(#[from] EngineError),
  #[error("解码错误: {0}")]
  DecodeError(#[from] DecodeError),
}

/// 一个模型的完整检测流程：预处理、推理、解码、绘制
///
/// 可廉价克隆并移动到后台线程，引擎仍归模型描述所有。
#[derive(Clone)]
pub struct Detector {
  name: String,
  engine: SharedEngine,
  labels: Arc<LabelSet>,
  input_size: u32,
  channel_order: ChannelOrder,
  draw: Arc<Draw>,
}

impl Detector {
  pub fn new(descriptor: &ModelDescriptor, draw: Arc<Draw>) -> Self {
    Self {
      name: descriptor.name().to_string(),
      engine: descriptor.engine(),
      labels: descriptor.labels().clone(),
      input_size: descriptor.input_size(),
      channel_order: ChannelOrder::default(),
      draw,
    }
  }

  pub fn with_channel_order(mut self, order: ChannelOrder) -> Self {
    self.channel_order = order;
    self
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn labels(&self) -> &Arc<LabelSet> {
    &self.labels
  }

  /// 对图像的副本执行一次检测，`threshold` 为 [0, 1] 内的概率
  pub fn find_objects(&self, image: &RgbImage, threshold: f32) -> Result<DecodeResult, DetectError> {
    let blob = NchwBlob::from_image(image, self.input_size, self.channel_order);
    debug!("模型 {} 输入: {:?}", self.name, blob.shape());

    let (tensor, elapsed) = {
      // 上一次推理 panic 后锁被标记为损坏，引擎本身仍可继续使用
      let mut engine = self.engine.lock().unwrap_or_else(|poisoned| {
        warn!("模型 {} 上一次推理异常退出", self.name);
        self.engine.clear_poison();
        poisoned.into_inner()
      });
      let now = Instant::now();
      let tensor = engine.forward(&blob)?;
      (tensor, now.elapsed())
    };
    info!("推理完成，耗时: {:.2?}", elapsed);

    let items = decode_detections(
      &tensor,
      image.width(),
      image.height(),
      &self.labels,
      threshold,
    )?;

    let mut annotated = image.clone();
    self
      .draw
      .draw_detections(&mut annotated, &items, &self.labels);
    info!("检测到 {} 个目标", items.len());

    Ok(DecodeResult {
      image: annotated,
      items: items.into_boxed_slice(),
      elapsed,
    })
  }
}
