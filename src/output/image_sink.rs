// 该文件是 Renliu （人流统计） 项目的一部分。
// src/output/image_sink.rs - 图片输出
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

use super::FrameSink;
use crate::error::{Error, Result};

/// 图片输出
///
/// 每写入一帧都覆盖保存到同一路径，最终落盘的是最后一帧。
pub struct ImageSink {
  /// 输出路径
  output_path: String,
}

impl ImageSink {
  /// 创建一个新的图片输出
  pub fn new(output_path: &str) -> Self {
    Self {
      output_path: output_path.to_string(),
    }
  }
}

impl FrameSink for ImageSink {
  fn write_frame(&mut self, image: &RgbImage) -> Result<()> {
    image
      .save(&self.output_path)
      .map_err(|e| Error::sink_write(e))
  }

  fn finish(&mut self) -> Result<()> {
    Ok(())
  }
}
