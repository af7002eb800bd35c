// 该文件是 YoloDetector 项目的一部分。
// src/model/tract.rs - 基于 tract 的 ONNX 推理引擎
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

use std::path::Path;

use tract_onnx::prelude::*;
use tracing::{debug, error, info};

use crate::{
  frame::{NchwBlob, OutputTensor},
  model::{DarknetCfg, EngineError, EngineLoader, InferenceEngine, RegionParams},
};

pub struct TractEngine {
  model: TypedRunnableModel<TypedModel>,
  input_size: u32,
  region: Option<RegionParams>,
}

impl TractEngine {
  pub fn load<P: AsRef<Path>>(cfg: &DarknetCfg, weights: P) -> Result<Self, EngineError> {
    let weights = weights.as_ref();
    if !weights.is_file() {
      error!("权重文件不存在: {}", weights.display());
      return Err(EngineError::MissingFile(weights.to_path_buf()));
    }

    let size = cfg.input_size() as usize;
    let load_error = |source: anyhow::Error| EngineError::LoadError {
      path: weights.to_path_buf(),
      source,
    };

    info!("加载模型文件: {}", weights.display());
    let model = tract_onnx::onnx()
      .model_for_path(weights)
      .map_err(load_error)?
      .with_input_fact(
        0,
        InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size, size)),
      )
      .map_err(load_error)?
      .into_optimized()
      .map_err(load_error)?
      .into_runnable()
      .map_err(load_error)?;
    info!("模型加载完成, 输入尺寸 {}x{}", size, size);

    Ok(Self {
      model,
      input_size: cfg.input_size(),
      region: cfg.region().cloned(),
    })
  }

  // 二维输出直接使用；四维输出按 region 层展开
  fn normalize_output(&self, shape: &[usize], data: &[f32]) -> Result<OutputTensor, EngineError> {
    let unexpected = || EngineError::UnexpectedOutput(shape.to_vec());

    match *shape {
      [rows, cols] | [1, rows, cols] => {
        OutputTensor::new(rows, cols, data.to_vec()).map_err(|_| unexpected())
      }
      [1, channels, grid_h, grid_w] => {
        let region = self.region.as_ref().ok_or_else(unexpected)?;
        if channels != region.channels() {
          error!(
            "region 输出通道数为 {}, 配置期望 {}",
            channels,
            region.channels()
          );
          return Err(unexpected());
        }
        region.flatten(data, grid_h, grid_w).ok_or_else(unexpected)
      }
      _ => Err(unexpected()),
    }
  }
}

impl InferenceEngine for TractEngine {
  fn name(&self) -> &'static str {
    "tract"
  }

  fn forward(&mut self, input: &NchwBlob) -> Result<OutputTensor, EngineError> {
    if input.size() != self.input_size {
      return Err(EngineError::InputSize {
        expected: self.input_size,
        actual: input.size(),
      });
    }

    let shape = input.shape();
    let tensor: Tensor = tract_ndarray::Array4::from_shape_vec(
      (shape[0], shape[1], shape[2], shape[3]),
      input.as_slice().to_vec(),
    )
    .map_err(|e| EngineError::ForwardError(e.into()))?
    .into_tensor();

    debug!("执行模型推理");
    let outputs = self
      .model
      .run(tvec!(tensor.into()))
      .map_err(EngineError::ForwardError)?;

    let output = outputs
      .first()
      .ok_or_else(|| EngineError::UnexpectedOutput(Vec::new()))?;
    let data = output
      .as_slice::<f32>()
      .map_err(EngineError::ForwardError)?;
    debug!("模型输出形状: {:?}", output.shape());

    self.normalize_output(output.shape(), data)
  }
}

/// 将权重文件当作 ONNX 图加载
#[derive(Debug, Clone, Copy, Default)]
pub struct TractLoader;

impl EngineLoader for TractLoader {
  fn load(&self, cfg: &DarknetCfg, weights: &Path) -> Result<Box<dyn InferenceEngine>, EngineError> {
    Ok(Box::new(TractEngine::load(cfg, weights)?))
  }
}
