// 该文件是 YoloDetector 项目的一部分。
// src/model/decode.rs - 输出张量解码
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

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use crate::{
  frame::OutputTensor,
  model::{Detection, LabelSet},
};

/// 每行前 5 列: 中心 x, 中心 y, 宽, 高, objectness
const PREFIX: usize = 5;
const OBJECTNESS: usize = 4;

#[derive(Error, Debug, PartialEq)]
pub enum DecodeError {
  #[error("输出张量列数 {cols} 与类别数 {classes} 不匹配, 期望 {}", .classes + PREFIX)]
  ShapeMismatch { cols: usize, classes: usize },
  #[error("置信度阈值必须在 [0, 1] 内, 实际为 {0}")]
  InvalidThreshold(f32),
}

/// 按行解码检测结果
///
/// 一行只有在 objectness 与最高类别分数都严格大于 `threshold` 时才会被接受。
/// 框的左边界截断到 0，上、右、下边界保持原值。
pub fn decode_detections(
  tensor: &OutputTensor,
  image_width: u32,
  image_height: u32,
  labels: &LabelSet,
  threshold: f32,
) -> Result<Vec<Detection>, DecodeError> {
  if tensor.cols() != PREFIX + labels.len() {
    return Err(DecodeError::ShapeMismatch {
      cols: tensor.cols(),
      classes: labels.len(),
    });
  }
  if !(0.0..=1.0).contains(&threshold) {
    return Err(DecodeError::InvalidThreshold(threshold));
  }

  let (w, h) = (image_width as f32, image_height as f32);
  let mut counters: HashMap<usize, u32> = HashMap::new();
  let mut items = Vec::new();

  for (i, row) in tensor.iter_rows().enumerate() {
    let objectness = row[OBJECTNESS];
    // NaN 分数与低分一样被拒绝
    if objectness.is_nan() || objectness <= threshold {
      continue;
    }

    let (class_id, score) = max_class(&row[PREFIX..]);
    if score.is_nan() || score <= threshold {
      debug!("第 {} 行类别分数 {:.4} 未超过阈值", i, score);
      continue;
    }

    let instance = counters
      .entry(class_id)
      .and_modify(|n| *n += 1)
      .or_insert(1);

    let center_x = row[0] * w;
    let center_y = row[1] * h;
    let width = row[2] * w;
    let height = row[3] * h;

    // 只截断左边界
    let left = (center_x - width / 2.0).max(0.0);
    let top = center_y - height / 2.0;
    let right = center_x + width / 2.0;
    let bottom = center_y + height / 2.0;

    let label = labels.label(class_id).unwrap_or_default().to_string();
    items.push(Detection {
      class_id,
      label,
      instance: *instance,
      objectness,
      score,
      bbox: [left, top, right, bottom],
    });
  }

  debug!("解码 {} 行, 接受 {} 个目标", tensor.rows(), items.len());
  Ok(items)
}

// 线性扫描，分数相同时保留下标最小的类别
fn max_class(scores: &[f32]) -> (usize, f32) {
  let mut best = (0usize, scores.first().copied().unwrap_or(f32::NEG_INFINITY));
  for (c, &score) in scores.iter().enumerate().skip(1) {
    if score > best.1 {
      best = (c, score);
    }
  }
  best
}
