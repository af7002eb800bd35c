// 该文件是 YoloDetector 项目的一部分。
// src/model/cfg.rs - Darknet 网络配置读取
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

use thiserror::Error;
use tracing::debug;

use crate::model::RegionParams;

#[derive(Error, Debug)]
pub enum CfgError {
  #[error("无法读取网络配置: {0}")]
  IoError(#[from] std::io::Error),
  #[error("网络配置中缺少 width 行")]
  MissingWidth,
  #[error("width 行中没有有效数字: {0:?}")]
  InvalidWidth(String),
  #[error("[region] 段参数无效: {0}")]
  InvalidRegion(String),
}

/// 只保留检测流程需要的配置项，其余交给推理引擎
#[derive(Debug, Clone, PartialEq)]
pub struct DarknetCfg {
  input_size: u32,
  region: Option<RegionParams>,
}

impl DarknetCfg {
  pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CfgError> {
    let text = std::fs::read_to_string(path.as_ref())?;
    debug!("读取网络配置: {}", path.as_ref().display());
    Self::parse(&text)
  }

  pub fn parse(text: &str) -> Result<Self, CfgError> {
    let input_size = parse_input_size(text)?;
    let region = parse_region(text)?;

    Ok(Self { input_size, region })
  }

  /// 正方形网络输入的边长
  pub fn input_size(&self) -> u32 {
    self.input_size
  }

  pub fn region(&self) -> Option<&RegionParams> {
    self.region.as_ref()
  }

  /// 配置中声明的类别数（仅当存在 [region] 段时）
  pub fn classes(&self) -> Option<usize> {
    self.region.as_ref().map(RegionParams::classes)
  }
}

// 取第一行以 width 开头的配置，拼接其中所有数字
fn parse_input_size(text: &str) -> Result<u32, CfgError> {
  let line = text
    .lines()
    .find(|line| line.starts_with("width"))
    .ok_or(CfgError::MissingWidth)?;

  let digits: String = line.chars().filter(char::is_ascii_digit).collect();
  match digits.parse::<u32>() {
    Ok(size) if size > 0 => Ok(size),
    _ => Err(CfgError::InvalidWidth(line.to_string())),
  }
}

fn parse_region(text: &str) -> Result<Option<RegionParams>, CfgError> {
  let mut in_region = false;
  let mut found = false;
  let mut anchors = None;
  let mut classes = None;
  let mut num = None;
  let mut thresh = None;

  for line in text.lines() {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
      continue;
    }
    if line.starts_with('[') {
      in_region = line == "[region]";
      found |= in_region;
      continue;
    }
    if !in_region {
      continue;
    }

    let Some((key, value)) = line.split_once('=') else {
      continue;
    };
    let value = value.trim();
    match key.trim() {
      "anchors" => anchors = Some(parse_anchors(value)?),
      "classes" => classes = Some(parse_value::<usize>("classes", value)?),
      "num" => num = Some(parse_value::<usize>("num", value)?),
      "thresh" => thresh = Some(parse_value::<f32>("thresh", value)?),
      _ => {}
    }
  }

  if !found {
    return Ok(None);
  }

  let anchors = anchors.ok_or_else(|| CfgError::InvalidRegion("缺少 anchors".to_string()))?;
  let classes = classes.ok_or_else(|| CfgError::InvalidRegion("缺少 classes".to_string()))?;
  let num = num.unwrap_or(anchors.len());
  if num != anchors.len() {
    return Err(CfgError::InvalidRegion(format!(
      "num = {} 与 anchors 数量 {} 不一致",
      num,
      anchors.len()
    )));
  }

  Ok(Some(RegionParams::new(anchors, classes, thresh)))
}

fn parse_anchors(value: &str) -> Result<Vec<(f32, f32)>, CfgError> {
  let values = value
    .split(',')
    .map(str::trim)
    .filter(|v| !v.is_empty())
    .map(|v| parse_value::<f32>("anchors", v))
    .collect::<Result<Vec<_>, _>>()?;

  if values.is_empty() || values.len() % 2 != 0 {
    return Err(CfgError::InvalidRegion(format!(
      "anchors 数量必须为非零偶数, 实际为 {}",
      values.len()
    )));
  }

  Ok(values.chunks_exact(2).map(|p| (p[0], p[1])).collect())
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, CfgError> {
  value
    .parse::<T>()
    .map_err(|_| CfgError::InvalidRegion(format!("{} = {}", key, value)))
}
