// 该文件是 YoloDetector 项目的一部分。
// src/output/color.rs - 标签文字颜色选择
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

use image::Rgb;

pub const DARK_TEXT: Rgb<u8> = Rgb([0, 0, 0]);
pub const LIGHT_TEXT: Rgb<u8> = Rgb([255, 255, 255]);

const LUMINANCE_THRESHOLD: f64 = 130.0;

/// sqrt(0.299 R² + 0.587 G² + 0.114 B²)
pub fn luminance(color: Rgb<u8>) -> f64 {
  let [r, g, b] = color.0.map(f64::from);
  (0.299 * r * r + 0.587 * g * g + 0.114 * b * b).sqrt()
}

/// 亮度不低于 130 的背景用深色文字，否则用浅色文字
pub fn text_color_for_luminance(luminance: f64) -> Rgb<u8> {
  if luminance >= LUMINANCE_THRESHOLD {
    DARK_TEXT
  } else {
    LIGHT_TEXT
  }
}

pub fn pick_text_color(background: Rgb<u8>) -> Rgb<u8> {
  text_color_for_luminance(luminance(background))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn extremes() {
    assert_eq!(pick_text_color(Rgb([255, 255, 255])), DARK_TEXT);
    assert_eq!(pick_text_color(Rgb([0, 0, 0])), LIGHT_TEXT);
  }

  #[test]
  fn channels_are_weighted() {
    // 纯红 ≈ 139.4，纯绿 ≈ 195.4，纯蓝 ≈ 86.1
    assert_eq!(pick_text_color(Rgb([255, 0, 0])), DARK_TEXT);
    assert_eq!(pick_text_color(Rgb([0, 255, 0])), DARK_TEXT);
    assert_eq!(pick_text_color(Rgb([0, 0, 255])), LIGHT_TEXT);
    assert!((luminance(Rgb([0, 0, 255])) - 86.1).abs() < 0.1);
  }

  #[test]
  fn boundary_maps_to_dark_text() {
    assert_eq!(text_color_for_luminance(130.0), DARK_TEXT);
    assert_eq!(text_color_for_luminance(129.999), LIGHT_TEXT);
    assert_eq!(text_color_for_luminance(130.001), DARK_TEXT);
  }

  #[test]
  fn is_pure() {
    let color = Rgb([12, 200, 77]);
    assert_eq!(pick_text_color(color), pick_text_color(color));
  }
}
