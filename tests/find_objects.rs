// 该文件是 YoloDetector 项目的一部分。
// tests/find_objects.rs - 从资源目录到输出文件的完整检测流程
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

use std::{fs, path::Path, sync::Arc};

use image::{Rgb, RgbImage};
use rand::{SeedableRng, rngs::StdRng};
use url::Url;

use yolo_detector::{
  FromUrl,
  frame::OutputTensor,
  input::ImageFileInput,
  model::{DecodeError, DetectError, Detector, ModelRegistry, StubLoader},
  output::{Draw, OutputWrapper, Render},
};

const VOC_CFG: &str = "[net]
width=64
height=64
channels=3

[region]
anchors = 1.08,1.19, 3.42,4.41
classes=2
num=2
";

fn write_assets(root: &Path) {
  for dataset in ["coco", "voc"] {
    let dir = root.join(dataset);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(format!("{dataset}.names")), "cat\r\ndog\r\n").unwrap();
    for stem in [dataset.to_string(), format!("tiny-{dataset}")] {
      fs::write(dir.join(format!("{stem}.cfg")), VOC_CFG).unwrap();
      fs::write(dir.join(format!("{stem}.onnx")), b"weights").unwrap();
    }
  }
}

fn scenario() -> OutputTensor {
  OutputTensor::from_rows(&[
    [0.5f32, 0.5, 0.2, 0.3, 0.9, 0.1, 0.8],
    [0.5, 0.5, 0.2, 0.3, 0.2, 0.1, 0.9],
    [0.2, 0.2, 0.1, 0.1, 0.95, 0.7, 0.6],
    [0.8, 0.8, 0.1, 0.1, 0.9, 0.2, 0.85],
  ])
  .unwrap()
}

fn registry(root: &Path, output: OutputTensor) -> ModelRegistry {
  write_assets(root);
  ModelRegistry::load(
    root,
    &StubLoader::with_output(output),
    &mut StdRng::seed_from_u64(11),
  )
  .unwrap()
}

#[test]
fn detects_and_renders_record() {
  let dir = tempfile::tempdir().unwrap();
  let registry = registry(dir.path(), scenario());
  let model = registry.find("tiny voc").unwrap();

  let source = dir.path().join("input.png");
  RgbImage::from_pixel(100, 100, Rgb([128, 128, 128]))
    .save(&source)
    .unwrap();
  let url = Url::parse(&format!("image://{}", source.display())).unwrap();
  let input = ImageFileInput::from_url(&url).unwrap();

  let detector = Detector::new(model, Arc::new(Draw::default()));
  let result = detector.find_objects(input.image(), 0.3).unwrap();

  assert_eq!(
    result.lines(),
    vec!["dog #1 80.00%", "cat #1 70.00%", "dog #2 85.00%"]
  );
  let dog = model.labels().color(1).unwrap();
  assert_eq!(*result.image.get_pixel(40, 50), dog);
  assert_eq!(*input.image().get_pixel(40, 50), Rgb([128, 128, 128]));

  let out = dir.path().join("out/result.png");
  let url = Url::parse(&format!("record://{}", out.display())).unwrap();
  let output = OutputWrapper::from_url(&url).unwrap();
  output.render_result(&result).unwrap();

  assert!(out.is_file());
  let record: serde_json::Value =
    serde_json::from_str(&fs::read_to_string(out.with_extension("json")).unwrap()).unwrap();
  assert_eq!(record["detections"].as_array().unwrap().len(), 3);
  assert_eq!(record["detections"][2]["instance"], 2);
}

#[test]
fn mismatched_tensor_aborts_detection() {
  let dir = tempfile::tempdir().unwrap();
  let registry = registry(dir.path(), OutputTensor::empty(9));
  let detector = Detector::new(registry.get(0).unwrap(), Arc::new(Draw::default()));

  let image = RgbImage::new(10, 10);
  assert!(matches!(
    detector.find_objects(&image, 0.3),
    Err(DetectError::DecodeError(DecodeError::ShapeMismatch {
      cols: 9,
      classes: 2
    }))
  ));
}
