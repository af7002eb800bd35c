// 该文件是 YoloDetector 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, url_file_path};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch: expected '{expected}', found '{found}'")]
  SchemaMismatch { expected: &'static str, found: String },
  #[error("Invalid path in URI: {0}")]
  InvalidPath(String),
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
}

/// 一张已解码的 RGB 图像及其来源路径
#[derive(Debug, Clone)]
pub struct ImageFileInput {
  path: PathBuf,
  image: RgbImage,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    Self::open(Self::path_from_url(url)?)
  }
}

impl ImageFileInput {
  /// 校验方案并取出文件路径，不读取文件
  pub fn path_from_url(url: &Url) -> Result<PathBuf, ImageFileInputError> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch {
        expected: Self::SCHEME,
        found: url.scheme().to_string(),
      });
    }

    url_file_path(url).map_err(|e| ImageFileInputError::InvalidPath(e.to_string()))
  }

  /// 任意深度与通道数的图像统一转换为 8 位 RGB
  pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ImageFileInputError> {
    let path = path.as_ref();
    let image = ImageReader::open(path)?
      .with_guessed_format()?
      .decode()?
      .to_rgb8();
    debug!(
      "读取图像 {}: {}x{}",
      path.display(),
      image.width(),
      image.height()
    );

    Ok(Self {
      path: path.to_path_buf(),
      image,
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn image(&self) -> &RgbImage {
    &self.image
  }

  pub fn into_image(self) -> RgbImage {
    self.image
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  #[test]
  fn reads_png_as_rgb() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("in.png");
    RgbImage::from_pixel(3, 2, Rgb([1, 2, 3])).save(&path).unwrap();

    let input = ImageFileInput::open(&path).unwrap();
    assert_eq!(input.image().dimensions(), (3, 2));
    assert_eq!(*input.image().get_pixel(0, 0), Rgb([1, 2, 3]));
    assert_eq!(input.path(), path.as_path());
  }

  #[test]
  fn undecodable_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.png");
    std::fs::write(&path, b"not an image").unwrap();

    assert!(matches!(
      ImageFileInput::open(&path),
      Err(ImageFileInputError::ImageLoadError(_))
    ));
  }

  #[test]
  fn missing_file_is_an_io_error() {
    assert!(matches!(
      ImageFileInput::open("/nonexistent/in.png"),
      Err(ImageFileInputError::IoError(_))
    ));
  }

  #[test]
  fn wrong_scheme_is_rejected() {
    let url = Url::parse("file:///tmp/in.png").unwrap();
    assert!(matches!(
      ImageFileInput::path_from_url(&url),
      Err(ImageFileInputError::SchemaMismatch { .. })
    ));
  }
}
