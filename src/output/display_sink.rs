// 该文件是 Renliu （人流统计） 项目的一部分。
// src/output/display_sink.rs - 实时显示输出
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

use anyhow::{Context as _, anyhow};
use gstreamer::{self as gst, prelude::*};
use gstreamer_app as gst_app;
use image::RgbImage;

use super::FrameSink;
use crate::error::{Error, Result};

/// 实时显示输出
///
/// 通过 GStreamer 的 appsrc 管道把标注后的帧送进系统默认的
/// 视频显示窗口。窗口只用于观看，取消统一走 Ctrl-C。
pub struct DisplaySink {
  /// GStreamer 管道
  pipeline: gst::Pipeline,
  /// 帧入口
  appsrc: gst_app::AppSrc,
  /// 帧序号，用于计算 PTS
  frame_index: u64,
  /// 每帧时长
  frame_duration: gst::ClockTime,
}

impl DisplaySink {
  /// 创建一个新的显示输出
  pub fn new(width: u32, height: u32, fps: f64) -> Result<Self> {
    Self::open(width, height, fps).map_err(Error::sink_write)
  }

  fn open(width: u32, height: u32, fps: f64) -> anyhow::Result<Self> {
    gst::init().context("无法初始化 GStreamer")?;

    let fps_int = fps.round().max(1.0) as i32;
    let description = format!(
      "appsrc name=src is-live=true format=time \
       caps=video/x-raw,format=RGB,width={},height={},framerate={}/1 \
       ! videoconvert ! autovideosink sync=false",
      width, height, fps_int,
    );

    let pipeline = gst::parse::launch(&description)
      .context("无法创建显示管道")?
      .downcast::<gst::Pipeline>()
      .map_err(|_| anyhow!("显示管道类型不符"))?;

    let appsrc = pipeline
      .by_name("src")
      .context("找不到 appsrc 元素")?
      .downcast::<gst_app::AppSrc>()
      .map_err(|_| anyhow!("无法转换元素为 appsrc"))?;

    pipeline
      .set_state(gst::State::Playing)
      .context("无法启动显示管道")?;

    let frame_duration = gst::ClockTime::from_mseconds((1000.0 / fps_int as f64) as u64);

    Ok(Self {
      pipeline,
      appsrc,
      frame_index: 0,
      frame_duration,
    })
  }

  fn push_frame(&mut self, image: &RgbImage) -> anyhow::Result<()> {
    let mut buffer = gst::Buffer::from_mut_slice(image.as_raw().clone());
    {
      let buffer = buffer
        .get_mut()
        .ok_or_else(|| anyhow!("无法获取缓冲区可写引用"))?;
      buffer.set_pts(self.frame_duration * self.frame_index);
      buffer.set_duration(self.frame_duration);
    }

    self.frame_index += 1;
    self
      .appsrc
      .push_buffer(buffer)
      .map_err(|e| anyhow!("推送帧失败: {:?}", e))?;

    Ok(())
  }
}

impl FrameSink for DisplaySink {
  fn write_frame(&mut self, image: &RgbImage) -> Result<()> {
    self.push_frame(image).map_err(Error::sink_write)
  }

  fn finish(&mut self) -> Result<()> {
    let _ = self.appsrc.end_of_stream();
    self
      .pipeline
      .set_state(gst::State::Null)
      .map_err(|e| Error::sink_write(anyhow!("无法关闭显示管道: {}", e)))?;
    Ok(())
  }
}

impl Drop for DisplaySink {
  fn drop(&mut self) {
    let _ = self.pipeline.set_state(gst::State::Null);
  }
}
