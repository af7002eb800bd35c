// 该文件是 YoloDetector 项目的一部分。
// src/model/region.rs - YOLOv2 region 层输出展开
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

use tracing::debug;

use crate::frame::OutputTensor;

const BOX_FIELDS: usize = 5; // x, y, w, h, objectness

/// `[region]` 段参数
#[derive(Debug, Clone, PartialEq)]
pub struct RegionParams {
  anchors: Vec<(f32, f32)>,
  classes: usize,
  thresh: Option<f32>,
}

impl RegionParams {
  pub fn new(anchors: Vec<(f32, f32)>, classes: usize, thresh: Option<f32>) -> Self {
    Self {
      anchors,
      classes,
      thresh,
    }
  }

  pub fn anchors(&self) -> &[(f32, f32)] {
    &self.anchors
  }

  pub fn num(&self) -> usize {
    self.anchors.len()
  }

  pub fn classes(&self) -> usize {
    self.classes
  }

  pub fn thresh(&self) -> Option<f32> {
    self.thresh
  }

  /// 原始输出的通道数 num * (5 + classes)
  pub fn channels(&self) -> usize {
    self.num() * (BOX_FIELDS + self.classes)
  }

  /// 将 `[1, num * (5 + classes), grid_h, grid_w]` 的原始输出展开为
  /// 每个 (行, 列, anchor) 一行的 `[x, y, w, h, objectness, class...]`。
  ///
  /// 返回 `None` 表示数据长度与网格不符。
  pub fn flatten(&self, raw: &[f32], grid_h: usize, grid_w: usize) -> Option<OutputTensor> {
    let spatial = grid_h * grid_w;
    if raw.len() != self.channels() * spatial {
      debug!(
        "region 输出长度不匹配: 实际 {}, 期望 {}",
        raw.len(),
        self.channels() * spatial
      );
      return None;
    }

    let cols = BOX_FIELDS + self.classes;
    let mut data = Vec::with_capacity(spatial * self.num() * cols);
    let at = |channel: usize, idx: usize| raw[channel * spatial + idx];
    let mut logits = vec![0f32; self.classes];

    for row in 0..grid_h {
      for col in 0..grid_w {
        let idx = row * grid_w + col;
        for (a, &(anchor_w, anchor_h)) in self.anchors.iter().enumerate() {
          let base = a * cols;

          let x = (col as f32 + sigmoid(at(base, idx))) / grid_w as f32;
          let y = (row as f32 + sigmoid(at(base + 1, idx))) / grid_h as f32;
          let w = at(base + 2, idx).exp() * anchor_w / grid_w as f32;
          let h = at(base + 3, idx).exp() * anchor_h / grid_h as f32;
          let objectness = sigmoid(at(base + 4, idx));

          data.extend_from_slice(&[x, y, w, h, objectness]);

          for (c, logit) in logits.iter_mut().enumerate() {
            *logit = at(base + BOX_FIELDS + c, idx);
          }
          softmax(&mut logits);
          for &p in logits.iter() {
            let prob = objectness * p;
            let prob = match self.thresh {
              Some(t) if prob <= t => 0.0,
              _ => prob,
            };
            data.push(prob);
          }
        }
      }
    }

    OutputTensor::new(spatial * self.num(), cols, data).ok()
  }
}

fn sigmoid(x: f32) -> f32 {
  1.0 / (1.0 + (-x).exp())
}

fn softmax(values: &mut [f32]) {
  let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
  let mut sum = 0.0;
  for v in values.iter_mut() {
    *v = (*v - max).exp();
    sum += *v;
  }
  if sum > 0.0 {
    for v in values.iter_mut() {
      *v /= sum;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-5
  }

  #[test]
  fn single_cell_single_anchor() {
    let params = RegionParams::new(vec![(2.0, 4.0)], 2, None);
    // 1x1 网格，通道顺序: tx, ty, tw, th, to, c0, c1
    let raw = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
    let tensor = params.flatten(&raw, 1, 1).unwrap();

    assert_eq!(tensor.rows(), 1);
    assert_eq!(tensor.cols(), 7);
    let row = tensor.row(0);
    assert!(approx(row[0], 0.5));
    assert!(approx(row[1], 0.5));
    assert!(approx(row[2], 2.0));
    assert!(approx(row[3], 4.0));
    assert!(approx(row[4], 0.5));
    assert!(approx(row[5], 0.25));
    assert!(approx(row[6], 0.25));
  }

  #[test]
  fn rows_are_cell_major_then_anchor() {
    let params = RegionParams::new(vec![(1.0, 1.0), (1.0, 1.0)], 1, None);
    let spatial = 2; // 1 行 2 列
    let mut raw = vec![0f32; params.channels() * spatial];
    // 第二个 anchor 的 objectness 在第二个格子上取大值
    raw[(6 + 4) * spatial + 1] = 10.0;

    let tensor = params.flatten(&raw, 1, 2).unwrap();
    assert_eq!(tensor.rows(), 4);
    assert!(tensor.row(3)[4] > 0.99);
    assert!(approx(tensor.row(3)[0], 0.75));
    assert!(approx(tensor.row(0)[4], 0.5));
  }

  #[test]
  fn class_probabilities_below_thresh_are_zeroed() {
    let params = RegionParams::new(vec![(1.0, 1.0)], 2, Some(0.3));
    let raw = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
    let tensor = params.flatten(&raw, 1, 1).unwrap();
    assert_eq!(tensor.row(0)[5], 0.0);
    assert_eq!(tensor.row(0)[6], 0.0);
  }

  #[test]
  fn wrong_length_is_rejected() {
    let params = RegionParams::new(vec![(1.0, 1.0)], 2, None);
    assert!(params.flatten(&[0.0; 6], 1, 1).is_none());
  }
}
