// 该文件是 YoloDetector 项目的一部分。
// src/model/stub.rs - 测试用推理引擎
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

use tracing::debug;

use crate::{
  frame::{NchwBlob, OutputTensor},
  model::{DarknetCfg, EngineError, EngineLoader, InferenceEngine},
};

/// 不做计算，直接返回预置张量的引擎
#[derive(Debug, Clone)]
pub struct StubEngine {
  input_size: u32,
  output: OutputTensor,
}

impl StubEngine {
  pub fn new(input_size: u32, output: OutputTensor) -> Self {
    Self { input_size, output }
  }
}

impl InferenceEngine for StubEngine {
  fn name(&self) -> &'static str {
    "stub"
  }

  fn forward(&mut self, input: &NchwBlob) -> Result<OutputTensor, EngineError> {
    if input.size() != self.input_size {
      return Err(EngineError::InputSize {
        expected: self.input_size,
        actual: input.size(),
      });
    }
    debug!("stub 引擎返回 {} 行", self.output.rows());
    Ok(self.output.clone())
  }
}

/// 只检查权重文件存在的加载器
///
/// 未指定输出时，按配置中的类别数返回空张量。
#[derive(Debug, Clone, Default)]
pub struct StubLoader {
  output: Option<OutputTensor>,
}

impl StubLoader {
  pub fn with_output(output: OutputTensor) -> Self {
    Self {
      output: Some(output),
    }
  }
}

impl EngineLoader for StubLoader {
  fn load(&self, cfg: &DarknetCfg, weights: &Path) -> Result<Box<dyn InferenceEngine>, EngineError> {
    if !weights.is_file() {
      return Err(EngineError::MissingFile(weights.to_path_buf()));
    }

    let output = match &self.output {
      Some(output) => output.clone(),
      None => OutputTensor::empty(5 + cfg.classes().unwrap_or(0)),
    };
    Ok(Box::new(StubEngine::new(cfg.input_size(), output)))
  }
}
