// 该文件是 YoloDetector 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use std::{thread, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use rand::{SeedableRng, rngs::StdRng};
use tracing::{info, warn};

use yolo_detector::{
  FromUrl,
  frame::ChannelOrder,
  input::ImageFileInput,
  model::{EngineLoader, ModelRegistry},
  output::{Draw, OutputWrapper, Render},
  shell::{Shell, ShellEvent},
};

#[cfg(feature = "model_tract")]
fn engine_loader() -> Result<Box<dyn EngineLoader>> {
  Ok(Box::new(yolo_detector::model::TractLoader))
}

#[cfg(not(feature = "model_tract"))]
fn engine_loader() -> Result<Box<dyn EngineLoader>> {
  anyhow::bail!("未启用任何推理后端，请使用 model_tract 特性构建")
}

fn load_draw(args: &args::Args) -> Result<Draw> {
  let fallback = args.assets.join("font.ttf");
  let draw = match &args.font {
    Some(font) => Draw::from_font_file(font)?,
    None if fallback.is_file() => Draw::from_font_file(&fallback)?,
    None => Draw::default(),
  };

  if !draw.has_font() {
    warn!("未找到字体文件，标签将只绘制底色");
  }
  Ok(draw.with_font_size(args.font_size))
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("模型资源目录: {}", args.assets.display());
  info!("模型: {}", args.model);
  info!("置信度阈值: {}%", args.threshold);

  let loader = engine_loader()?;
  let registry = match args.color_seed {
    Some(seed) => ModelRegistry::load(&args.assets, loader.as_ref(), &mut StdRng::seed_from_u64(seed)),
    None => ModelRegistry::load(&args.assets, loader.as_ref(), &mut rand::thread_rng()),
  }
  .context("模型加载失败")?;

  if args.list_models {
    for model in registry.models() {
      println!("{}\t{}\t{}", model.key(), model.name(), model.input_size());
    }
    return Ok(());
  }

  let input = args.input.as_ref().context("缺少输入图像")?;
  let output = args.output.as_ref().map(OutputWrapper::from_url).transpose()?;

  let mut shell = Shell::new(registry, load_draw(&args)?);
  shell.select_model(&args.model)?;
  shell.set_threshold_percent(args.threshold);
  if args.bgr {
    shell.set_channel_order(ChannelOrder::Bgr);
  }
  shell.open_image(ImageFileInput::path_from_url(input)?)?;

  shell.find_objects()?;
  let event = loop {
    if let Some(event) = shell.poll() {
      break event;
    }
    thread::sleep(Duration::from_millis(10));
  };

  match event {
    ShellEvent::Completed { .. } => {
      println!("Runtime: {}", shell.runtime_text());
      for line in shell.detections() {
        println!("{}", line);
      }
    }
    ShellEvent::Failed(message) => anyhow::bail!("检测失败: {}", message),
  }

  if let (Some(output), Some(result)) = (&output, shell.result()) {
    output.render_result(result)?;
    info!("结果已输出到 {}", args.output.as_ref().map(|u| u.as_str()).unwrap_or_default());
  }

  shell.close();
  Ok(())
}
