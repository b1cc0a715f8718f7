// 该文件是 Renliu （人流统计） 项目的一部分。
// src/output/mod.rs - 输出模块
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

#[cfg(feature = "display")]
mod display_sink;
mod image_sink;
mod video_sink;

#[cfg(feature = "display")]
pub use display_sink::DisplaySink;
pub use image_sink::ImageSink;
pub use video_sink::VideoSink;

use image::RgbImage;

use crate::error::Result;

/// 帧输出器
///
/// 接收已标注的帧。写入失败视为致命错误，不做部分成功的续写。
pub trait FrameSink {
  /// 写入一帧
  fn write_frame(&mut self, image: &RgbImage) -> Result<()>;

  /// 完成写入（视频输出需要在此写入文件尾）
  fn finish(&mut self) -> Result<()>;
}

/// 按扩展名创建文件输出
///
/// 图片扩展名走静态图片输出，其余走视频输出。
pub fn create_file_sink(
  output_path: &str,
  width: u32,
  height: u32,
  fps: Option<f64>,
) -> Result<Box<dyn FrameSink>> {
  let lower = output_path.to_lowercase();

  if lower.ends_with(".jpg")
    || lower.ends_with(".jpeg")
    || lower.ends_with(".png")
    || lower.ends_with(".bmp")
  {
    Ok(Box::new(ImageSink::new(output_path)))
  } else {
    Ok(Box::new(VideoSink::new(
      output_path,
      width,
      height,
      fps.unwrap_or(30.0),
    )?))
  }
}
