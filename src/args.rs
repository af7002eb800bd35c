// 该文件是 YoloDetector 项目的一部分。
// src/args.rs - 命令行参数
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

use clap::Parser;
use url::Url;

/// YoloDetector 参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入图像，例如 image:///tmp/dog.jpg
  #[arg(long, value_name = "SOURCE", required_unless_present = "list_models")]
  pub input: Option<Url>,

  /// 输出路径
  /// 支持格式:
  /// - 图像: image:///tmp/out.png
  /// - 图像与 JSON 记录: record:///tmp/out.png
  #[arg(long, value_name = "OUTPUT")]
  pub output: Option<Url>,

  /// 模型资源目录，包含 coco/ 与 voc/
  #[arg(long, default_value = "yolo", value_name = "DIR")]
  pub assets: PathBuf,

  /// 模型名称: coco, tiny-coco, voc, tiny-voc
  #[arg(long, default_value = "coco", value_name = "MODEL")]
  pub model: String,

  /// 置信度阈值百分比 (0 - 100)
  #[arg(long, default_value_t = 30, value_name = "PERCENT",
        value_parser = clap::value_parser!(u8).range(0..=100))]
  pub threshold: u8,

  /// 标签字体文件 (TTF/OTF)，默认尝试 <assets>/font.ttf
  #[arg(long, value_name = "FONT")]
  pub font: Option<PathBuf>,

  /// 标签字号（像素）
  #[arg(long, default_value_t = 16.0, value_name = "PX")]
  pub font_size: f32,

  /// 以 BGR 通道顺序送入网络，默认 RGB
  #[arg(long)]
  pub bgr: bool,

  /// 标签颜色的随机种子
  #[arg(long, value_name = "SEED")]
  pub color_seed: Option<u64>,

  /// 列出可用模型后退出
  #[arg(long)]
  pub list_models: bool,
}
