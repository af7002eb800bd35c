// 该文件是 YoloDetector 项目的一部分。
// src/model/registry.rs - 模型注册表
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
  fmt,
  path::{Path, PathBuf},
  sync::{Arc, Mutex},
};

use rand::Rng;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::model::{
  CfgError, DarknetCfg, Dataset, EngineError, EngineLoader, LabelSet, SharedEngine, Variant,
};

#[derive(Error, Debug)]
pub enum RegistryError {
  #[error("无法读取标签文件 {path}: {source}")]
  LabelFile {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("网络配置 {path} 无效: {source}")]
  Cfg {
    path: PathBuf,
    #[source]
    source: CfgError,
  },
  #[error("模型 {name} 的类别数 {cfg} 与标签数 {labels} 不一致")]
  ClassCount {
    name: String,
    cfg: usize,
    labels: usize,
  },
  #[error("模型 {name} 加载失败: {source}")]
  Engine {
    name: String,
    #[source]
    source: EngineError,
  },
}

/// 注册表中的固定模型，按此顺序排列
const MODELS: [(&str, &str, Dataset, Variant); 4] = [
  ("Coco", "coco", Dataset::Coco, Variant::Full),
  ("Tiny Coco", "tiny-coco", Dataset::Coco, Variant::Tiny),
  ("Voc", "voc", Dataset::Voc, Variant::Full),
  ("Tiny Voc", "tiny-voc", Dataset::Voc, Variant::Tiny),
];

/// 一个可用的检测模型
#[derive(Clone)]
pub struct ModelDescriptor {
  name: String,
  key: String,
  dataset: Dataset,
  variant: Variant,
  cfg_path: PathBuf,
  weights_path: PathBuf,
  cfg: DarknetCfg,
  labels: Arc<LabelSet>,
  engine: SharedEngine,
}

impl fmt::Debug for ModelDescriptor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ModelDescriptor")
      .field("name", &self.name)
      .field("key", &self.key)
      .field("dataset", &self.dataset)
      .field("variant", &self.variant)
      .field("cfg_path", &self.cfg_path)
      .field("weights_path", &self.weights_path)
      .field("input_size", &self.cfg.input_size())
      .field("labels", &self.labels.len())
      .finish_non_exhaustive()
  }
}

impl ModelDescriptor {
  /// 显示名称，例如 `Tiny Coco`
  pub fn name(&self) -> &str {
    &self.name
  }

  /// 文件名主干，例如 `tiny-coco`
  pub fn key(&self) -> &str {
    &self.key
  }

  pub fn dataset(&self) -> Dataset {
    self.dataset
  }

  pub fn variant(&self) -> Variant {
    self.variant
  }

  pub fn cfg_path(&self) -> &Path {
    &self.cfg_path
  }

  pub fn weights_path(&self) -> &Path {
    &self.weights_path
  }

  pub fn cfg(&self) -> &DarknetCfg {
    &self.cfg
  }

  pub fn input_size(&self) -> u32 {
    self.cfg.input_size()
  }

  pub fn labels(&self) -> &Arc<LabelSet> {
    &self.labels
  }

  pub fn engine(&self) -> SharedEngine {
    self.engine.clone()
  }
}

/// 启动时加载一次的模型列表
#[derive(Debug, Clone)]
pub struct ModelRegistry {
  models: Vec<ModelDescriptor>,
}

impl ModelRegistry {
  /// 从资源目录加载全部模型，任何一个失败则整体失败
  pub fn load<P, L, R>(root: P, loader: &L, rng: &mut R) -> Result<Self, RegistryError>
  where
    P: AsRef<Path>,
    L: EngineLoader + ?Sized,
    R: Rng + ?Sized,
  {
    let root = root.as_ref();
    info!("从 {} 加载模型", root.display());

    let coco = Arc::new(Self::load_labels(root, Dataset::Coco, rng)?);
    let voc = Arc::new(Self::load_labels(root, Dataset::Voc, rng)?);

    let mut models = Vec::with_capacity(MODELS.len());
    for (name, key, dataset, variant) in MODELS {
      let labels = match dataset {
        Dataset::Coco => coco.clone(),
        Dataset::Voc => voc.clone(),
      };
      let dir = root.join(dataset.dir_name());
      let cfg_path = dir.join(format!("{}.cfg", key));
      let weights_path = dir.join(format!("{}.onnx", key));

      let cfg = DarknetCfg::open(&cfg_path).map_err(|source| {
        error!("网络配置 {} 无效: {}", cfg_path.display(), source);
        RegistryError::Cfg {
          path: cfg_path.clone(),
          source,
        }
      })?;

      if let Some(classes) = cfg.classes()
        && classes != labels.len()
      {
        error!("模型 {} 类别数不一致", name);
        return Err(RegistryError::ClassCount {
          name: name.to_string(),
          cfg: classes,
          labels: labels.len(),
        });
      }

      let engine = loader
        .load(&cfg, &weights_path)
        .map_err(|source| {
          error!("模型 {} 加载失败: {}", name, source);
          RegistryError::Engine {
            name: name.to_string(),
            source,
          }
        })?;
      info!(
        "模型 {} 已加载，后端 {}，输入尺寸 {}",
        name,
        engine.name(),
        cfg.input_size()
      );

      models.push(ModelDescriptor {
        name: name.to_string(),
        key: key.to_string(),
        dataset,
        variant,
        cfg_path,
        weights_path,
        cfg,
        labels,
        engine: Arc::new(Mutex::new(engine)),
      });
    }

    Ok(Self { models })
  }

  fn load_labels<R: Rng + ?Sized>(
    root: &Path,
    dataset: Dataset,
    rng: &mut R,
  ) -> Result<LabelSet, RegistryError> {
    let path = root
      .join(dataset.dir_name())
      .join(format!("{}.names", dataset.dir_name()));
    let text = std::fs::read_to_string(&path).map_err(|source| {
      error!("无法读取标签文件 {}: {}", path.display(), source);
      RegistryError::LabelFile {
        path: path.clone(),
        source,
      }
    })?;
    let labels = LabelSet::parse_labels(&text);
    debug!("{} 标签数: {}", dataset.display_name(), labels.len());

    Ok(LabelSet::with_random_colors(labels, rng))
  }

  pub fn models(&self) -> &[ModelDescriptor] {
    &self.models
  }

  pub fn get(&self, index: usize) -> Option<&ModelDescriptor> {
    self.models.get(index)
  }

  /// 按显示名称或文件名主干查找，不区分大小写
  pub fn position(&self, name: &str) -> Option<usize> {
    self.models.iter().position(|model| {
      model.name.eq_ignore_ascii_case(name) || model.key.eq_ignore_ascii_case(name)
    })
  }

  pub fn find(&self, name: &str) -> Option<&ModelDescriptor> {
    self.position(name).and_then(|index| self.get(index))
  }

  pub fn names(&self) -> Vec<&str> {
    self.models.iter().map(ModelDescriptor::name).collect()
  }

  pub fn len(&self) -> usize {
    self.models.len()
  }

  pub fn is_empty(&self) -> bool {
    self.models.is_empty()
  }
}
