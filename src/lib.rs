// 该文件是 YoloDetector 项目的一部分。
// src/lib.rs - 库主文件
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

use std::path::PathBuf;

pub mod frame;
pub mod input;
pub mod model;
pub mod output;
pub mod shell;
pub mod task;

pub trait FromUrl {
  type Error;
  fn from_url(url: &url::Url) -> Result<Self, Self::Error>
  where
    Self: Sized;
}

pub trait FromUrlWithScheme: FromUrl {
  const SCHEME: &'static str;
}

/// 取出 URL 中的文件路径并做百分号解码
///
/// `image:///tmp/a.png` 得到绝对路径 `/tmp/a.png`，
/// `image://out/a.png` 得到相对路径 `out/a.png`。
pub fn url_file_path(url: &url::Url) -> Result<PathBuf, std::string::FromUtf8Error> {
  let path = urlencoding::decode(url.path())?;
  match url.host_str() {
    Some(host) if !host.is_empty() => Ok(PathBuf::from(format!("{}{}", host, path))),
    _ => Ok(PathBuf::from(path.into_owned())),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use url::Url;

  #[test]
  fn absolute_path_is_decoded() {
    let url = Url::parse("image:///tmp/my%20photo.jpg").unwrap();
    assert_eq!(url_file_path(&url).unwrap(), PathBuf::from("/tmp/my photo.jpg"));
  }

  #[test]
  fn host_becomes_relative_prefix() {
    let url = Url::parse("image://out/result.png").unwrap();
    assert_eq!(url_file_path(&url).unwrap(), PathBuf::from("out/result.png"));
  }
}
