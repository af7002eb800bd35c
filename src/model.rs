// 该文件是 YoloDetector 项目的一部分。
// src/model.rs - 模型
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

use std::{fmt, time::Duration};

use image::{Rgb, RgbImage};
use rand::Rng;
use thiserror::Error;

/// 标签集合所属的数据集
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
  Coco,
  Voc,
}

impl Dataset {
  /// 资源目录下的子目录名，同时也是标签文件名
  pub fn dir_name(&self) -> &'static str {
    match self {
      Dataset::Coco => "coco",
      Dataset::Voc => "voc",
    }
  }

  pub fn display_name(&self) -> &'static str {
    match self {
      Dataset::Coco => "Coco",
      Dataset::Voc => "Voc",
    }
  }
}

/// 网络规模
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
  Full,
  Tiny,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LabelSetError {
  #[error("标签数量 {labels} 与颜色数量 {colors} 不一致")]
  ColorCountMismatch { labels: usize, colors: usize },
}

/// 有序标签及按下标对应的显示颜色
///
/// 同一数据集的完整版与 tiny 版共享同一个 `Arc<LabelSet>`，
/// 因此这里不提供任何可变访问。
#[derive(Debug)]
pub struct LabelSet {
  labels: Box<[String]>,
  colors: Box<[Rgb<u8>]>,
}

impl LabelSet {
  pub fn new(labels: Vec<String>, colors: Vec<Rgb<u8>>) -> Result<Self, LabelSetError> {
    if labels.len() != colors.len() {
      return Err(LabelSetError::ColorCountMismatch {
        labels: labels.len(),
        colors: colors.len(),
      });
    }

    Ok(Self {
      labels: labels.into_boxed_slice(),
      colors: colors.into_boxed_slice(),
    })
  }

  /// 为每个标签生成一个随机颜色
  pub fn with_random_colors<R: Rng + ?Sized>(labels: Vec<String>, rng: &mut R) -> Self {
    let colors = labels
      .iter()
      .map(|_| Rgb([rng.r#gen(), rng.r#gen(), rng.r#gen()]))
      .collect::<Vec<_>>()
      .into_boxed_slice();

    Self {
      labels: labels.into_boxed_slice(),
      colors,
    }
  }

  /// 按行解析标签文件内容，`\n` 与 `\r\n` 均可，末尾换行不产生空标签
  pub fn parse_labels(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  pub fn label(&self, class_id: usize) -> Option<&str> {
    self.labels.get(class_id).map(String::as_str)
  }

  pub fn color(&self, class_id: usize) -> Option<Rgb<u8>> {
    self.colors.get(class_id).copied()
  }

  pub fn labels(&self) -> &[String] {
    &self.labels
  }

  pub fn colors(&self) -> &[Rgb<u8>] {
    &self.colors
  }
}

/// 一个被接受的检测结果
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
  pub class_id: usize,
  pub label: String,
  /// 同类目标的序号，从 1 开始
  pub instance: u32,
  pub objectness: f32,
  pub score: f32,
  pub bbox: [f32; 4], // [left, top, right, bottom]，像素坐标，只有 left 截断到 0
}

impl Detection {
  pub fn left(&self) -> f32 {
    self.bbox[0]
  }

  pub fn top(&self) -> f32 {
    self.bbox[1]
  }

  pub fn right(&self) -> f32 {
    self.bbox[2]
  }

  pub fn bottom(&self) -> f32 {
    self.bbox[3]
  }

  pub fn width(&self) -> f32 {
    self.bbox[2] - self.bbox[0]
  }

  pub fn height(&self) -> f32 {
    self.bbox[3] - self.bbox[1]
  }
}

impl fmt::Display for Detection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} #{} {:.2}%",
      self.label,
      self.instance,
      self.score * 100.0
    )
  }
}

/// 一次检测的输出
#[derive(Debug, Clone)]
pub struct DecodeResult {
  /// 标注后的图像，总是输入图像的副本
  pub image: RgbImage,
  pub items: Box<[Detection]>,
  /// 仅包含前向推理的耗时
  pub elapsed: Duration,
}

impl DecodeResult {
  pub fn elapsed_ms(&self) -> u128 {
    self.elapsed.as_millis()
  }

  /// 按候选框顺序排列的检测结果文本
  pub fn lines(&self) -> Vec<String> {
    self.items.iter().map(ToString::to_string).collect()
  }
}

mod cfg;
mod decode;
mod detector;
mod engine;
mod region;
mod registry;
mod stub;
#[cfg(feature = "model_tract")]
mod tract;

pub use self::cfg::{CfgError, DarknetCfg};
pub use self::decode::{DecodeError, decode_detections};
pub use self::detector::{DetectError, Detector};
pub use self::engine::{EngineError, EngineLoader, InferenceEngine, SharedEngine};
pub use self::region::RegionParams;
pub use self::registry::{ModelDescriptor, ModelRegistry, RegistryError};
pub use self::stub::{StubEngine, StubLoader};
#[cfg(feature = "model_tract")]
pub use self::tract::{TractEngine, TractLoader};

#[cfg(test)]
mod tests {
  use super::*;
  use rand::{SeedableRng, rngs::StdRng};

  #[test]
  fn label_set_requires_aligned_colors() {
    let err = LabelSet::new(vec!["a".into(), "b".into()], vec![Rgb([0, 0, 0])]).unwrap_err();
    assert_eq!(
      err,
      LabelSetError::ColorCountMismatch {
        labels: 2,
        colors: 1
      }
    );
  }

  #[test]
  fn random_colors_follow_label_count() {
    let mut rng = StdRng::seed_from_u64(7);
    let set = LabelSet::with_random_colors(vec!["cat".into(), "dog".into()], &mut rng);
    assert_eq!(set.len(), 2);
    assert_eq!(set.colors().len(), 2);
    assert!(set.color(2).is_none());
  }

  #[test]
  fn same_seed_gives_same_colors() {
    let labels = || vec!["cat".to_string(), "dog".to_string(), "bird".to_string()];
    let a = LabelSet::with_random_colors(labels(), &mut StdRng::seed_from_u64(42));
    let b = LabelSet::with_random_colors(labels(), &mut StdRng::seed_from_u64(42));
    assert_eq!(a.colors(), b.colors());
  }

  #[test]
  fn labels_keep_file_order() {
    let labels = LabelSet::parse_labels("person\r\nbicycle\ncar\n");
    assert_eq!(labels, vec!["person", "bicycle", "car"]);
  }

  #[test]
  fn detection_display_uses_percentage() {
    let det = Detection {
      class_id: 1,
      label: "dog".into(),
      instance: 2,
      objectness: 0.9,
      score: 0.8,
      bbox: [40.0, 35.0, 60.0, 65.0],
    };
    assert_eq!(det.to_string(), "dog #2 80.00%");
    assert_eq!(det.width(), 20.0);
    assert_eq!(det.height(), 30.0);
  }
}
