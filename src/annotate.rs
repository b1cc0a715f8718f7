// 该文件是 Renliu （人流统计） 项目的一部分。
// src/annotate.rs - 标注绘制
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

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::detector::Detection;

/// 边界框与文本颜色（绿色）
const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
/// 人数文本锚点，固定在左上角区域
const COUNT_ANCHOR_X: i32 = 10;
const COUNT_ANCHOR_Y: i32 = 10;
/// 人数文本字号
const COUNT_FONT_SIZE: f32 = 28.0;

/// 标注绘制工具
///
/// 在帧上原地绘制检测框和人数文本。绘制只改变像素内容，
/// 不改变图像尺寸。
pub struct Annotator {
  /// 字体
  font: FontArc,
  /// 字体大小
  font_scale: PxScale,
}

impl Default for Annotator {
  fn default() -> Self {
    Self::new()
  }
}

impl Annotator {
  /// 创建一个新的标注绘制工具
  pub fn new() -> Self {
    // 使用内置的默认字体数据
    let font_data = include_bytes!("../assets/DejaVuSans.ttf");
    let font = FontArc::try_from_slice(font_data).expect("无法加载字体");

    Self {
      font,
      font_scale: PxScale::from(COUNT_FONT_SIZE),
    }
  }

  /// 在图像上绘制一个检测框
  ///
  /// 框会被裁剪到图像范围内，完全落在图像外的框不绘制。
  pub fn draw_box(&self, image: &mut RgbImage, detection: &Detection) {
    // 先裁剪原点，再用裁剪后的原点计算可见范围
    let x = detection.x.max(0.0);
    let y = detection.y.max(0.0);
    let width = (detection.x + detection.width).min(image.width() as f32) - x;
    let height = (detection.y + detection.height).min(image.height() as f32) - y;

    if width < 1.0 || height < 1.0 {
      return;
    }

    let (x, y) = (x as i32, y as i32);
    let (width, height) = (width as u32, height as u32);
    let rect = Rect::at(x, y).of_size(width, height);
    draw_hollow_rect_mut(image, rect, BOX_COLOR);

    // 绘制第二个边框以增加可见度
    if width > 2 && height > 2 {
      let inner = Rect::at(x + 1, y + 1).of_size(width - 2, height - 2);
      draw_hollow_rect_mut(image, inner, BOX_COLOR);
    }
  }

  /// 在左上角绘制人数文本
  pub fn draw_count(&self, image: &mut RgbImage, count: usize) {
    let text = format!("People Count: {}", count);
    draw_text_mut(
      image,
      BOX_COLOR,
      COUNT_ANCHOR_X,
      COUNT_ANCHOR_Y,
      self.font_scale,
      &self.font,
      &text,
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

  fn detection(x: f32, y: f32, width: f32, height: f32) -> Detection {
    Detection {
      x,
      y,
      width,
      height,
      confidence: 0.9,
      class_id: 0,
      class_name: "person".to_string(),
    }
  }

  #[test]
  fn box_inside_image_draws_green_border() {
    let annotator = Annotator::new();
    let mut image = RgbImage::new(100, 100);

    annotator.draw_box(&mut image, &detection(10.0, 10.0, 40.0, 30.0));

    assert_eq!(*image.get_pixel(10, 10), BOX_COLOR);
    assert_eq!(*image.get_pixel(49, 39), BOX_COLOR);
    assert_eq!(*image.get_pixel(30, 25), BLACK);
  }

  #[test]
  fn negative_origin_box_is_clipped_to_image() {
    let annotator = Annotator::new();
    let mut image = RgbImage::new(100, 100);

    // 原点在图像外：可见部分是 (0,0) 到 (19,19)
    annotator.draw_box(&mut image, &detection(-10.0, -10.0, 30.0, 30.0));

    assert_eq!(*image.get_pixel(0, 0), BOX_COLOR);
    assert_eq!(*image.get_pixel(19, 0), BOX_COLOR);
    // 以未裁剪原点计算范围时，边框会画到这里
    assert_eq!(*image.get_pixel(29, 0), BLACK);
    assert_eq!(*image.get_pixel(0, 29), BLACK);
  }

  #[test]
  fn box_past_right_edge_is_clipped() {
    let annotator = Annotator::new();
    let mut image = RgbImage::new(100, 100);

    annotator.draw_box(&mut image, &detection(90.0, 90.0, 30.0, 30.0));

    assert_eq!(*image.get_pixel(90, 90), BOX_COLOR);
    assert_eq!(*image.get_pixel(99, 99), BOX_COLOR);
  }

  #[test]
  fn box_fully_outside_image_draws_nothing() {
    let annotator = Annotator::new();
    let mut image = RgbImage::new(100, 100);

    annotator.draw_box(&mut image, &detection(-50.0, -50.0, 30.0, 30.0));

    assert!(image.pixels().all(|p| *p == BLACK));
  }
}
