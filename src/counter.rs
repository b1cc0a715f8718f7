// 该文件是 Renliu （人流统计） 项目的一部分。
// src/counter.rs - 单帧人数统计
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
use tracing::debug;

use crate::annotate::Annotator;
use crate::detector::Detector;
use crate::error::Result;

/// 单帧人数统计器
///
/// 对一帧图像运行检测器，统计属于人物类别的检测框数量，
/// 并在帧上绘制边界框与人数文本。逐帧独立统计，
/// 相邻帧之间不做身份关联或去重。
pub struct PeopleCounter<D> {
  /// 目标检测器
  detector: D,
  /// 计为 “人” 的类别序号
  person_class: usize,
  /// 标注绘制工具
  annotator: Annotator,
}

impl<D: Detector> PeopleCounter<D> {
  /// 创建一个新的人数统计器
  pub fn new(detector: D, person_class: usize) -> Self {
    Self {
      detector,
      person_class,
      annotator: Annotator::new(),
    }
  }

  /// 处理一帧图像
  ///
  /// 返回本帧的人数，图像被原地标注。检测器的错误原样向上传播。
  pub fn process(&mut self, image: &mut RgbImage) -> Result<usize> {
    let detections = self.detector.detect(image)?;

    let mut count = 0usize;
    for detection in &detections {
      if detection.class_id != self.person_class {
        continue;
      }
      count += 1;
      self.annotator.draw_box(image, detection);
    }

    self.annotator.draw_count(image, count);

    debug!("检测到 {} 个目标，其中 {} 人", detections.len(), count);
    Ok(count)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::detector::Detection;
  use image::{Rgb, RgbImage};

  /// 返回固定检测结果的检测器
  struct StubDetector {
    detections: Vec<Detection>,
  }

  impl Detector for StubDetector {
    fn detect(&mut self, _image: &RgbImage) -> Result<Vec<Detection>> {
      Ok(self.detections.clone())
    }
  }

  fn detection(class_id: usize, class_name: &str, x: f32, y: f32, w: f32, h: f32) -> Detection {
    Detection {
      x,
      y,
      width: w,
      height: h,
      confidence: 0.9,
      class_id,
      class_name: class_name.to_string(),
    }
  }

  const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
  const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

  #[test]
  fn counts_only_person_detections() {
    // 3 个人物检测加 1 个非人物检测
    let stub = StubDetector {
      detections: vec![
        detection(0, "person", 10.0, 60.0, 20.0, 40.0),
        detection(0, "person", 50.0, 60.0, 20.0, 40.0),
        detection(0, "person", 90.0, 60.0, 20.0, 40.0),
        detection(2, "car", 10.0, 110.0, 40.0, 20.0),
      ],
    };
    let mut counter = PeopleCounter::new(stub, 0);
    let mut image = RgbImage::new(160, 140);

    let count = counter.process(&mut image).unwrap();

    assert_eq!(count, 3);
    // 每个人物框的左上角像素被着色
    assert_eq!(*image.get_pixel(10, 60), GREEN);
    assert_eq!(*image.get_pixel(50, 60), GREEN);
    assert_eq!(*image.get_pixel(90, 60), GREEN);
    // 非人物检测不绘制边界框
    assert_eq!(*image.get_pixel(10, 110), BLACK);
  }

  #[test]
  fn empty_frame_yields_zero_with_overlay() {
    let stub = StubDetector { detections: vec![] };
    let mut counter = PeopleCounter::new(stub, 0);
    let mut image = RgbImage::new(320, 240);

    let count = counter.process(&mut image).unwrap();
    assert_eq!(count, 0);

    // "People Count: 0" 文本仍然绘制在左上角区域
    let overlay_drawn = (0..240u32)
      .flat_map(|x| (0..48u32).map(move |y| (x, y)))
      .any(|(x, y)| *image.get_pixel(x, y) != BLACK);
    assert!(overlay_drawn);
  }

  #[test]
  fn annotation_preserves_dimensions() {
    let stub = StubDetector {
      detections: vec![detection(0, "person", 5.0, 50.0, 30.0, 60.0)],
    };
    let mut counter = PeopleCounter::new(stub, 0);
    let mut image = RgbImage::new(321, 243);

    counter.process(&mut image).unwrap();

    assert_eq!(image.width(), 321);
    assert_eq!(image.height(), 243);
  }

  #[test]
  fn identical_frames_yield_identical_annotations() {
    let make_counter = || {
      PeopleCounter::new(
        StubDetector {
          detections: vec![
            detection(0, "person", 12.0, 70.0, 25.0, 50.0),
            detection(2, "car", 80.0, 70.0, 30.0, 20.0),
          ],
        },
        0,
      )
    };

    let mut image_a = RgbImage::new(200, 160);
    let mut image_b = RgbImage::new(200, 160);

    let count_a = make_counter().process(&mut image_a).unwrap();
    let count_b = make_counter().process(&mut image_b).unwrap();

    assert_eq!(count_a, count_b);
    assert_eq!(image_a.as_raw(), image_b.as_raw());
  }

  #[test]
  fn custom_person_class_is_respected() {
    let stub = StubDetector {
      detections: vec![
        detection(0, "person", 10.0, 60.0, 20.0, 40.0),
        detection(2, "car", 50.0, 60.0, 20.0, 40.0),
      ],
    };
    // 把 car 当作统计类别
    let mut counter = PeopleCounter::new(stub, 2);
    let mut image = RgbImage::new(160, 140);

    assert_eq!(counter.process(&mut image).unwrap(), 1);
  }
}
