// 该文件是 Renliu （人流统计） 项目的一部分。
// src/detector/yolo.rs - YOLO 目标检测器
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

use image::RgbImage;
use ort::session::Session;
use ort::value::Tensor;

use super::{COCO_CLASSES, Detection, Detector};
use crate::error::{Error, Result};

/// 模型输入边长（YOLOv8 方形输入）
const INPUT_SIZE: u32 = 640;
/// YOLOv8 640x640 输入对应的候选框数量
const NUM_PROPOSALS: usize = 8400;
/// COCO 数据集类别数量
const NUM_CLASSES: usize = 80;

/// YOLO 目标检测器
///
/// 构造时一次性从 ONNX 文件加载权重并建立推理会话，
/// 会话由本实例独占持有，随实例销毁一起释放。
pub struct YoloDetector {
  /// ONNX Runtime 会话
  session: Session,
  /// 置信度阈值
  confidence_threshold: f32,
  /// NMS IOU 阈值
  nms_threshold: f32,
}

impl YoloDetector {
  /// 创建一个新的 YOLO 检测器
  pub fn new(model_path: &str, confidence_threshold: f32, nms_threshold: f32) -> Result<Self> {
    let session = Session::builder()
      .and_then(|mut builder| builder.commit_from_file(model_path))
      .map_err(|e| Error::model_load(model_path, e))?;

    Ok(Self {
      session,
      confidence_threshold,
      nms_threshold,
    })
  }

  /// 预处理图像: 缩放到模型输入尺寸，转为 [0,1] 归一化的 NCHW 张量
  fn preprocess(&self, image: &RgbImage) -> Result<ort::value::DynValue> {
    let resized = image::imageops::resize(
      image,
      INPUT_SIZE,
      INPUT_SIZE,
      image::imageops::FilterType::Triangle,
    );

    let size = (INPUT_SIZE * INPUT_SIZE) as usize;
    let raw = resized.as_raw();
    let mut data = vec![0f32; 3 * size];

    for idx in 0..size {
      data[idx] = raw[idx * 3] as f32 / 255.0;
      data[size + idx] = raw[idx * 3 + 1] as f32 / 255.0;
      data[2 * size + idx] = raw[idx * 3 + 2] as f32 / 255.0;
    }

    let shape = [1usize, 3, INPUT_SIZE as usize, INPUT_SIZE as usize];
    let tensor =
      Tensor::from_array((shape, data.into_boxed_slice())).map_err(|e| Error::inference(e))?;

    Ok(tensor.into_dyn())
  }
}

impl Detector for YoloDetector {
  /// 运行推理
  fn detect(&mut self, image: &RgbImage) -> Result<Vec<Detection>> {
    let original_width = image.width() as f32;
    let original_height = image.height() as f32;

    let input = self.preprocess(image)?;

    let outputs = self
      .session
      .run(ort::inputs!["images" => input])
      .map_err(|e| Error::inference(e))?;

    let output = outputs
      .get("output0")
      .ok_or_else(|| Error::inference("模型缺少 output0 输出"))?;

    let (_shape, data) = output
      .try_extract_tensor::<f32>()
      .map_err(|e| Error::inference(e))?;

    let detections = decode_proposals(
      data,
      self.confidence_threshold,
      original_width,
      original_height,
    )?;

    Ok(nms(detections, self.nms_threshold))
  }
}

/// 解码 YOLOv8 输出
///
/// 输出布局为 [1, 84, 8400]: 每个候选框 4 个坐标 (cx, cy, w, h) 加
/// 80 个类别分数，按行主序展开，即第 r 行第 i 个候选框位于
/// `data[r * 8400 + i]`。坐标在 640x640 输入空间内，需要缩放回原图。
/// 其他导出布局（不同输入分辨率、YOLOv5 等）的输出大小与此不符，
/// 视为推理错误而不是继续越界读取。
fn decode_proposals(
  data: &[f32],
  confidence_threshold: f32,
  original_width: f32,
  original_height: f32,
) -> Result<Vec<Detection>> {
  let expected = (4 + NUM_CLASSES) * NUM_PROPOSALS;
  if data.len() != expected {
    return Err(Error::inference(format!(
      "模型输出大小不符: 期望 {} 个元素 (1x{}x{}), 实际 {}",
      expected,
      4 + NUM_CLASSES,
      NUM_PROPOSALS,
      data.len()
    )));
  }

  let scale_x = original_width / INPUT_SIZE as f32;
  let scale_y = original_height / INPUT_SIZE as f32;

  let mut detections = Vec::new();

  for i in 0..NUM_PROPOSALS {
    // 找到最高类别分数
    let mut max_class_score = 0.0f32;
    let mut max_class_id = 0usize;

    for class_id in 0..NUM_CLASSES {
      let score = data[(4 + class_id) * NUM_PROPOSALS + i];
      if score > max_class_score {
        max_class_score = score;
        max_class_id = class_id;
      }
    }

    if max_class_score < confidence_threshold {
      continue;
    }

    // 解码边界框（中心点和宽高 → 左上角坐标），缩放回原图并裁剪到图内
    let cx = data[i];
    let cy = data[NUM_PROPOSALS + i];
    let w = data[2 * NUM_PROPOSALS + i];
    let h = data[3 * NUM_PROPOSALS + i];

    let x1 = ((cx - w / 2.0) * scale_x).clamp(0.0, original_width);
    let y1 = ((cy - h / 2.0) * scale_y).clamp(0.0, original_height);
    let x2 = ((cx + w / 2.0) * scale_x).clamp(0.0, original_width);
    let y2 = ((cy + h / 2.0) * scale_y).clamp(0.0, original_height);

    if x2 <= x1 || y2 <= y1 {
      continue;
    }

    detections.push(Detection {
      x: x1,
      y: y1,
      width: x2 - x1,
      height: y2 - y1,
      confidence: max_class_score,
      class_id: max_class_id,
      class_name: COCO_CLASSES
        .get(max_class_id)
        .unwrap_or(&"unknown")
        .to_string(),
    });
  }

  Ok(detections)
}

/// 非极大值抑制，仅在同类别检测框之间抑制
fn nms(mut detections: Vec<Detection>, threshold: f32) -> Vec<Detection> {
  // 按置信度降序排序
  detections.sort_by(|a, b| {
    b.confidence
      .partial_cmp(&a.confidence)
      .unwrap_or(std::cmp::Ordering::Equal)
  });

  let mut result = Vec::new();

  while !detections.is_empty() {
    let best = detections.remove(0);

    detections.retain(|det| {
      if det.class_id != best.class_id {
        return true;
      }
      iou(&best, det) < threshold
    });

    result.push(best);
  }

  result
}

/// 计算两个边界框的 IoU
fn iou(a: &Detection, b: &Detection) -> f32 {
  let x1 = a.x.max(b.x);
  let y1 = a.y.max(b.y);
  let x2 = (a.x + a.width).min(b.x + b.width);
  let y2 = (a.y + a.height).min(b.y + b.height);

  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let area_a = a.width * a.height;
  let area_b = b.width * b.height;
  let union = area_a + area_b - intersection;

  if union > 0.0 { intersection / union } else { 0.0 }
}
