// 该文件是 YoloDetector 项目的一部分。
// src/model/engine.rs - 推理引擎接口
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

use std::{
  path::{Path, PathBuf},
  sync::{Arc, Mutex},
};

use thiserror::Error;

use crate::{
  frame::{NchwBlob, OutputTensor},
  model::DarknetCfg,
};

#[derive(Error, Debug)]
pub enum EngineError {
  #[error("模型文件不存在: {0}")]
  MissingFile(PathBuf),
  #[error("模型加载失败: {path}")]
  LoadError {
    path: PathBuf,
    #[source]
    source: anyhow::Error,
  },
  #[error("输入尺寸不匹配: 期望 {expected}, 实际 {actual}")]
  InputSize { expected: u32, actual: u32 },
  #[error("推理执行失败")]
  ForwardError(#[source] anyhow::Error),
  #[error("无法识别的模型输出形状: {0:?}")]
  UnexpectedOutput(Vec<usize>),
}

/// 前向推理引擎，一个实例只属于一个模型描述
pub trait InferenceEngine: Send {
  fn name(&self) -> &'static str;

  /// 执行一次前向推理，输出为每行一个候选框的二维张量
  fn forward(&mut self, input: &NchwBlob) -> Result<OutputTensor, EngineError>;
}

/// 由网络配置与权重文件构建推理引擎
pub trait EngineLoader {
  fn load(&self, cfg: &DarknetCfg, weights: &Path) -> Result<Box<dyn InferenceEngine>, EngineError>;
}

/// 描述与后台任务之间共享的引擎句柄
pub type SharedEngine = Arc<Mutex<Box<dyn InferenceEngine>>>;
