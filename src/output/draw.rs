// 该文件是 YoloDetector 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  model::{Detection, LabelSet},
  output::color::pick_text_color,
};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 16.0;
const LABEL_CHAR_WIDTH: f32 = 8.0; // 无字体时每字符平均宽度（粗略估计）
const LABEL_BASELINE: u32 = 4; // 无字体时的下沉高度
const BOX_THICKNESS: i32 = 2;
const FALLBACK_COLOR: Rgb<u8> = Rgb([0, 0, 255]);

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("无法读取字体文件 {path}: {source}")]
  IoError {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("字体文件无效: {0}")]
  InvalidFont(PathBuf),
}

/// 标签文字的尺寸
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LabelMetrics {
  width: u32,
  height: u32,
  baseline: u32,
}

/// 在图像上绘制检测框与标签
///
/// 没有字体时仍绘制框与标签背景，但不绘制文字。
#[derive(Clone)]
pub struct Draw {
  font: Option<FontArc>,
  scale: PxScale,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      font: None,
      scale: PxScale::from(LABEL_FONT_SIZE),
    }
  }
}

impl Draw {
  pub fn with_font(font: FontArc) -> Self {
    Self {
      font: Some(font),
      ..Self::default()
    }
  }

  pub fn from_font_file<P: AsRef<Path>>(path: P) -> Result<Self, DrawError> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|source| DrawError::IoError {
      path: path.to_path_buf(),
      source,
    })?;
    let font = FontArc::try_from_vec(data).map_err(|_| DrawError::InvalidFont(path.to_path_buf()))?;
    info!("加载标签字体: {}", path.display());
    Ok(Self::with_font(font))
  }

  pub fn with_font_size(mut self, size: f32) -> Self {
    self.scale = PxScale::from(size);
    self
  }

  pub fn has_font(&self) -> bool {
    self.font.is_some()
  }

  /// 按顺序绘制所有检测结果，颜色取自标签集合
  pub fn draw_detections(&self, image: &mut RgbImage, items: &[Detection], labels: &LabelSet) {
    for item in items {
      let color = labels.color(item.class_id).unwrap_or(FALLBACK_COLOR);
      self.draw_bbox_with_label(image, item, color);
    }
  }

  fn label_metrics(&self, text: &str) -> LabelMetrics {
    match &self.font {
      Some(font) => {
        let (width, height) = text_size(self.scale, font, text);
        let baseline = font.as_scaled(self.scale).descent().abs().ceil() as u32;
        LabelMetrics {
          width,
          height,
          baseline,
        }
      }
      None => LabelMetrics {
        width: (text.chars().count() as f32 * LABEL_CHAR_WIDTH).ceil() as u32,
        height: self.scale.y.ceil() as u32,
        baseline: LABEL_BASELINE,
      },
    }
  }

  fn draw_bbox_with_label(&self, image: &mut RgbImage, item: &Detection, color: Rgb<u8>) {
    let (w, h) = image.dimensions();
    let x_min = to_pixel(item.left(), w);
    let y_min = to_pixel(item.top(), h);
    let x_max = to_pixel(item.right(), w);
    let y_max = to_pixel(item.bottom(), h);

    // 绘制边框（加粗为2像素）
    for t in 0..BOX_THICKNESS {
      let width = x_max - x_min + 1 - 2 * t;
      let height = y_max - y_min + 1 - 2 * t;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect = Rect::at(x_min + t, y_min + t).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(image, rect, color);
    }

    // 标签背景紧贴边框上方，高度包含下沉部分
    let label = item.to_string();
    let metrics = self.label_metrics(&label);
    let label_y = y_min - (metrics.height + metrics.baseline) as i32;
    if metrics.width > 0 {
      let rect = Rect::at(x_min, label_y).of_size(metrics.width, metrics.height + metrics.baseline);
      draw_filled_rect_mut(image, rect, color);
    }

    if let Some(font) = &self.font {
      draw_text_mut(
        image,
        pick_text_color(color),
        x_min,
        label_y,
        self.scale,
        font,
        &label,
      );
    } else {
      debug!("未加载字体, 跳过标签文字: {}", label);
    }
  }
}

// 坐标限制在图像尺寸的三倍范围内，之后的整数运算不会溢出；NaN 取 0
fn to_pixel(value: f32, extent: u32) -> i32 {
  let extent = extent as f32;
  value.clamp(-extent, 2.0 * extent) as i32
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::output::color::{DARK_TEXT, LIGHT_TEXT};

  const RED: Rgb<u8> = Rgb([255, 0, 0]);
  const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

  fn labels() -> LabelSet {
    LabelSet::new(vec!["dog".into()], vec![RED]).unwrap()
  }

  fn detection(bbox: [f32; 4]) -> Detection {
    Detection {
      class_id: 0,
      label: "dog".into(),
      instance: 1,
      objectness: 0.9,
      score: 0.8,
      bbox,
    }
  }

  #[test]
  fn box_is_two_pixels_wide() {
    let mut image = RgbImage::from_pixel(100, 100, BLACK);
    Draw::default().draw_detections(&mut image, &[detection([40.0, 35.0, 60.0, 65.0])], &labels());

    assert_eq!(*image.get_pixel(40, 50), RED);
    assert_eq!(*image.get_pixel(41, 50), RED);
    assert_eq!(*image.get_pixel(42, 50), BLACK);
    assert_eq!(*image.get_pixel(60, 50), RED);
    assert_eq!(*image.get_pixel(59, 50), RED);
    assert_eq!(*image.get_pixel(50, 65), RED);
    assert_eq!(*image.get_pixel(50, 50), BLACK);
  }

  #[test]
  fn label_background_sits_above_box() {
    let mut image = RgbImage::from_pixel(100, 100, BLACK);
    Draw::default().draw_detections(&mut image, &[detection([40.0, 35.0, 60.0, 65.0])], &labels());

    // 默认字号 16，下沉 4，背景占据 y ∈ [15, 34]
    assert_eq!(*image.get_pixel(45, 34), RED);
    assert_eq!(*image.get_pixel(45, 15), RED);
    assert_eq!(*image.get_pixel(45, 14), BLACK);
    assert_eq!(*image.get_pixel(39, 30), BLACK);
  }

  #[test]
  fn boxes_outside_the_image_do_not_panic() {
    let mut image = RgbImage::from_pixel(20, 20, BLACK);
    let items = [
      detection([0.0, -30.0, 25.0, 50.0]),
      detection([15.0, 15.0, 115.0, 115.0]),
      detection([5.0, 5.0, 5.0, 5.0]),
    ];
    Draw::default().draw_detections(&mut image, &items, &labels());
    assert_eq!(*image.get_pixel(0, 10), RED);
  }

  #[test]
  fn non_finite_boxes_do_not_overflow() {
    let mut image = RgbImage::from_pixel(20, 20, BLACK);
    let items = [
      detection([0.0, f32::NEG_INFINITY, f32::INFINITY, f32::INFINITY]),
      detection([f32::NAN, f32::NAN, f32::NAN, f32::NAN]),
      detection([0.0, 5.0, f32::MAX, 15.0]),
    ];
    Draw::default().draw_detections(&mut image, &items, &labels());
    assert_eq!(*image.get_pixel(0, 10), RED);
    assert_eq!(*image.get_pixel(10, 5), RED);
  }

  #[test]
  fn missing_font_file_is_reported() {
    assert!(matches!(
      Draw::from_font_file("/nonexistent/font.ttf"),
      Err(DrawError::IoError { .. })
    ));
  }

  #[test]
  fn invalid_font_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("font.ttf");
    std::fs::write(&path, b"definitely not a font").unwrap();
    assert!(matches!(
      Draw::from_font_file(&path),
      Err(DrawError::InvalidFont(_))
    ));
  }

  // 需要一个真实字体：YOLO_DETECTOR_TEST_FONT 指定路径，否则使用系统 DejaVu
  #[test]
  #[ignore = "需要 TTF 字体文件"]
  fn label_text_uses_readable_color() {
    let path = std::env::var("YOLO_DETECTOR_TEST_FONT")
      .unwrap_or_else(|_| "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf".to_string());
    let draw = Draw::from_font_file(&path).unwrap().with_font_size(20.0);
    assert!(draw.has_font());

    let bright = Rgb([250, 250, 250]);
    let dark = Rgb([20, 20, 60]);
    let labels = LabelSet::new(vec!["dog".into(), "cat".into()], vec![bright, dark]).unwrap();

    let mut image = RgbImage::from_pixel(200, 200, Rgb([128, 128, 128]));
    let mut on_bright = detection([10.0, 60.0, 90.0, 150.0]);
    let mut on_dark = detection([110.0, 60.0, 190.0, 150.0]);
    on_bright.class_id = 0;
    on_dark.class_id = 1;
    on_dark.label = "cat".into();
    draw.draw_detections(&mut image, &[on_bright, on_dark], &labels);

    let region = |x0: u32, x1: u32| {
      (x0..x1)
        .flat_map(|x| (20..58).map(move |y| (x, y)))
        .map(|(x, y)| *image.get_pixel(x, y))
        .collect::<Vec<_>>()
    };
    // 浅色背景上出现黑色文字，深色背景上出现白色文字
    assert!(region(10, 90).contains(&DARK_TEXT));
    assert!(!region(10, 90).contains(&LIGHT_TEXT));
    assert!(region(110, 190).contains(&LIGHT_TEXT));
  }
}
