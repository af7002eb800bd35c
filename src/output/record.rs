// 该文件是 YoloDetector 项目的一部分。
// src/output/record.rs - 图像与检测记录输出
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

use serde_json::{Value, json};
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::DecodeResult,
  output::{Render, SaveImageFileError, SaveImageFileOutput},
  url_file_path,
};

#[derive(Error, Debug)]
pub enum RecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("URI 路径无效: {0}")]
  InvalidPath(String),
  #[error("图像保存错误: {0}")]
  SaveImageError(#[from] SaveImageFileError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 保存标注图像，并在同名 `.json` 文件中记录检测结果
#[derive(Debug, Clone)]
pub struct RecordOutput {
  image: SaveImageFileOutput,
}

impl FromUrlWithScheme for RecordOutput {
  const SCHEME: &'static str = "record";
}

impl FromUrl for RecordOutput {
  type Error = RecordOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(RecordOutputError::SchemeMismatch);
    }
    let path = url_file_path(url).map_err(|e| RecordOutputError::InvalidPath(e.to_string()))?;
    Ok(Self::new(path))
  }
}

impl RecordOutput {
  pub fn new<P: Into<PathBuf>>(path: P) -> Self {
    Self {
      image: SaveImageFileOutput::new(path),
    }
  }

  pub fn record_path(&self) -> PathBuf {
    self.image.path().with_extension("json")
  }

  pub fn image_path(&self) -> &Path {
    self.image.path()
  }
}

pub fn to_record(result: &DecodeResult) -> Value {
  let detections: Vec<Value> = result
    .items
    .iter()
    .map(|item| {
      json!({
        "class_id": item.class_id,
        "label": item.label,
        "instance": item.instance,
        "score": item.score,
        "objectness": item.objectness,
        "bbox": item.bbox,
        "text": item.to_string(),
      })
    })
    .collect();

  json!({
    "width": result.image.width(),
    "height": result.image.height(),
    "runtime_ms": result.elapsed_ms() as u64,
    "detections": detections,
  })
}

impl Render<DecodeResult> for RecordOutput {
  type Error = RecordOutputError;

  fn render_result(&self, result: &DecodeResult) -> Result<(), Self::Error> {
    self.image.save_image(&result.image)?;

    let path = self.record_path();
    std::fs::write(&path, serde_json::to_string_pretty(&to_record(result))?)?;
    info!("保存检测记录到文件: {}", path.display());
    Ok(())
  }
}
