// 该文件是 YoloDetector 项目的一部分。
// src/frame.rs - 网络输入 NCHW 张量与二维输出张量定义
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

use image::{RgbImage, imageops::FilterType};
use thiserror::Error;

const RGB_CHANNELS: usize = 3;
const PIXEL_SCALE: f32 = 1.0 / 255.0;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TensorError {
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
}

/// 网络输入的通道顺序
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChannelOrder {
  /// R、G、B 平面（BGR 源做红蓝交换后的顺序）
  #[default]
  Rgb,
  Bgr,
}

/// 1 x 3 x size x size 的浮点输入，像素值已缩放到 [0, 1]
#[derive(Debug, Clone)]
pub struct NchwBlob {
  size: u32,
  data: Box<[f32]>,
}

impl NchwBlob {
  /// 将图像直接缩放到正方形（不做 letterbox）并转为平面格式
  pub fn from_image(image: &RgbImage, size: u32, order: ChannelOrder) -> Self {
    let resized = image::imageops::resize(image, size, size, FilterType::Triangle);

    let plane = (size as usize) * (size as usize);
    let mut data = vec![0f32; plane * RGB_CHANNELS];
    let planes: [usize; RGB_CHANNELS] = match order {
      ChannelOrder::Rgb => [0, 1, 2],
      ChannelOrder::Bgr => [2, 1, 0],
    };

    for (x, y, pixel) in resized.enumerate_pixels() {
      let idx = (y as usize) * (size as usize) + (x as usize);
      for (c, &p) in planes.iter().enumerate() {
        data[p * plane + idx] = pixel[c] as f32 * PIXEL_SCALE;
      }
    }

    Self {
      size,
      data: data.into_boxed_slice(),
    }
  }

  pub fn size(&self) -> u32 {
    self.size
  }

  pub fn shape(&self) -> [usize; 4] {
    [1, RGB_CHANNELS, self.size as usize, self.size as usize]
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }

  pub fn into_vec(self) -> Vec<f32> {
    self.data.into_vec()
  }
}

/// 行优先的二维输出张量，每行是一个候选框
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTensor {
  rows: usize,
  cols: usize,
  data: Box<[f32]>,
}

impl OutputTensor {
  pub fn new(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self, TensorError> {
    let expected = rows * cols;
    if data.len() != expected {
      return Err(TensorError::LengthMismatch {
        expected,
        actual: data.len(),
      });
    }

    Ok(Self {
      rows,
      cols,
      data: data.into_boxed_slice(),
    })
  }

  /// 由若干等长行构造；行长不一致时返回错误
  pub fn from_rows<R: AsRef<[f32]>>(rows: &[R]) -> Result<Self, TensorError> {
    let cols = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
    let mut data = Vec::with_capacity(rows.len() * cols);
    for row in rows {
      let row = row.as_ref();
      if row.len() != cols {
        return Err(TensorError::LengthMismatch {
          expected: cols,
          actual: row.len(),
        });
      }
      data.extend_from_slice(row);
    }
    Self::new(rows.len(), cols, data)
  }

  pub fn empty(cols: usize) -> Self {
    Self {
      rows: 0,
      cols,
      data: Box::new([]),
    }
  }

  pub fn rows(&self) -> usize {
    self.rows
  }

  pub fn cols(&self) -> usize {
    self.cols
  }

  pub fn row(&self, index: usize) -> &[f32] {
    &self.data[index * self.cols..(index + 1) * self.cols]
  }

  pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
    // cols 为 0 时 chunks_exact 会 panic
    self.data.chunks_exact(self.cols.max(1)).take(self.rows)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  #[test]
  fn blob_is_planar_and_scaled() {
    let image = RgbImage::from_pixel(4, 4, Rgb([255, 0, 51]));
    let blob = NchwBlob::from_image(&image, 4, ChannelOrder::Rgb);

    assert_eq!(blob.shape(), [1, 3, 4, 4]);
    let data = blob.as_slice();
    assert!(data[..16].iter().all(|&v| (v - 1.0).abs() < 1e-6));
    assert!(data[16..32].iter().all(|&v| v.abs() < 1e-6));
    assert!(data[32..].iter().all(|&v| (v - 0.2).abs() < 1e-6));
  }

  #[test]
  fn bgr_order_swaps_outer_planes() {
    let image = RgbImage::from_pixel(2, 2, Rgb([255, 0, 0]));
    let blob = NchwBlob::from_image(&image, 2, ChannelOrder::Bgr);

    let data = blob.as_slice();
    assert!(data[..4].iter().all(|&v| v.abs() < 1e-6));
    assert!(data[8..].iter().all(|&v| (v - 1.0).abs() < 1e-6));
  }

  #[test]
  fn blob_is_resized_to_square() {
    let image = RgbImage::new(7, 3);
    let blob = NchwBlob::from_image(&image, 5, ChannelOrder::Rgb);
    assert_eq!(blob.as_slice().len(), 3 * 5 * 5);
  }

  #[test]
  fn tensor_rejects_bad_length() {
    assert_eq!(
      OutputTensor::new(2, 3, vec![0.0; 5]),
      Err(TensorError::LengthMismatch {
        expected: 6,
        actual: 5
      })
    );
  }

  #[test]
  fn tensor_rows_are_row_major() {
    let tensor = OutputTensor::from_rows(&[[1.0f32, 2.0], [3.0, 4.0]]).unwrap();
    assert_eq!(tensor.rows(), 2);
    assert_eq!(tensor.row(1), &[3.0, 4.0]);
    assert_eq!(tensor.iter_rows().count(), 2);
    assert_eq!(OutputTensor::empty(7).iter_rows().count(), 0);
  }
}
