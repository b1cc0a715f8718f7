// 该文件是 Renliu （人流统计） 项目的一部分。
// src/input/mod.rs - 输入源模块
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

mod camera_source;
mod image_source;
mod video_source;

pub use camera_source::CameraSource;
pub use image_source::ImageSource;
pub use video_source::VideoSource;

use image::RgbImage;

use crate::error::Result;

/// 帧数据
pub struct Frame {
  /// RGB 图像数据
  pub image: RgbImage,
  /// 帧序号
  pub index: u64,
  /// 时间戳（毫秒）
  pub timestamp_ms: u64,
}

/// 输入源类型
pub enum InputSourceType {
  /// 图片文件
  Image,
  /// 视频文件
  Video,
  /// V4L2 摄像头
  Camera,
}

/// 输入源抽象
///
/// 以迭代器形式逐帧产出。迭代器返回 `None` 表示源耗尽；
/// 中途的读取错误产出一次 `Err`，之后不再重试。
pub trait InputSource: Iterator<Item = anyhow::Result<Frame>> {
  /// 获取输入源类型
  fn source_type(&self) -> InputSourceType;

  /// 获取帧宽度
  fn width(&self) -> u32;

  /// 获取帧高度
  fn height(&self) -> u32;

  /// 获取帧率（如果适用）
  fn fps(&self) -> Option<f64>;
}

/// 解析摄像头设备路径
///
/// 纯数字视为 V4L2 设备序号（`0` → `/dev/video0`），
/// 也接受 `/dev/videoN` 和 `v4l2://` 前缀的路径。
fn camera_device_path(source: &str) -> Option<String> {
  if let Ok(index) = source.parse::<u32>() {
    return Some(format!("/dev/video{}", index));
  }
  if let Some(path) = source.strip_prefix("v4l2://") {
    return Some(path.to_string());
  }
  if source.starts_with("/dev/video") {
    return Some(source.to_string());
  }
  None
}

/// 从路径创建输入源
///
/// 摄像头序号或设备路径交给 V4L2，按扩展名识别图片文件，
/// 其余视为视频文件。打开失败返回 `Error::SourceOpen`。
pub fn create_input_source(source: &str) -> Result<Box<dyn InputSource>> {
  if let Some(device) = camera_device_path(source) {
    return Ok(Box::new(CameraSource::new(&device)?));
  }

  let lower = source.to_lowercase();
  if lower.ends_with(".jpg")
    || lower.ends_with(".jpeg")
    || lower.ends_with(".png")
    || lower.ends_with(".bmp")
    || lower.ends_with(".gif")
    || lower.ends_with(".webp")
  {
    return Ok(Box::new(ImageSource::new(source)?));
  }

  Ok(Box::new(VideoSource::new(source)?))
}
