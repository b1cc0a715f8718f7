// 该文件是 Renliu （人流统计） 项目的一部分。
// src/output/video_sink.rs - 视频输出
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

use anyhow::Context as _;
use ffmpeg_next as ffmpeg;
use ffmpeg_next::format::{Pixel, output};
use ffmpeg_next::software::scaling::{context::Context as ScalingContext, flag::Flags};
use ffmpeg_next::util::frame::video::Video;
use ffmpeg_next::{Rational, codec};
use image::RgbImage;

use super::FrameSink;
use crate::error::{Error, Result};

/// 视频输出
///
/// 与输入源同分辨率、同帧率编码，优先 H.264，退化到 MPEG-4。
pub struct VideoSink {
  /// FFmpeg 输出上下文
  output_context: ffmpeg::format::context::Output,
  /// 视频编码器
  encoder: ffmpeg::encoder::Video,
  /// 缩放上下文（RGB24 -> YUV420P）
  scaler: ScalingContext,
  /// 视频宽度
  width: u32,
  /// 视频高度
  height: u32,
  /// 帧率
  fps: f64,
  /// 帧序号
  frame_index: u64,
  /// 视频流序号
  stream_index: usize,
  /// 时间基准
  time_base: Rational,
}

impl VideoSink {
  /// 创建一个新的视频输出
  pub fn new(output_path: &str, width: u32, height: u32, fps: f64) -> Result<Self> {
    Self::open(output_path, width, height, fps).map_err(Error::sink_write)
  }

  fn open(output_path: &str, width: u32, height: u32, fps: f64) -> anyhow::Result<Self> {
    ffmpeg::init().context("无法初始化 FFmpeg")?;

    let mut output_context = output(&output_path).context("无法创建输出文件")?;

    // 查找编码器
    let codec = ffmpeg::encoder::find(codec::Id::H264)
      .or_else(|| ffmpeg::encoder::find(codec::Id::MPEG4))
      .context("找不到视频编码器")?;

    let mut stream = output_context.add_stream(codec)?;
    let stream_index = stream.index();

    let context_encoder = ffmpeg::codec::context::Context::new_with_codec(codec);
    let mut encoder = context_encoder.encoder().video()?;

    let fps_int = fps.round().max(1.0) as i32;
    encoder.set_width(width);
    encoder.set_height(height);
    encoder.set_format(Pixel::YUV420P);
    encoder.set_frame_rate(Some(Rational::new(fps_int, 1)));
    encoder.set_time_base(Rational::new(1, fps_int));

    let encoder = encoder.open()?;
    stream.set_parameters(&encoder);

    let time_base = stream.time_base();

    output_context.write_header()?;

    let scaler = ScalingContext::get(
      Pixel::RGB24,
      width,
      height,
      Pixel::YUV420P,
      width,
      height,
      Flags::BILINEAR,
    )?;

    Ok(Self {
      output_context,
      encoder,
      scaler,
      width,
      height,
      fps,
      frame_index: 0,
      stream_index,
      time_base,
    })
  }

  /// 编码并写入帧，`None` 表示冲刷编码器
  fn encode_frame(&mut self, frame: Option<&Video>) -> anyhow::Result<()> {
    if let Some(f) = frame {
      self.encoder.send_frame(f)?;
    } else {
      self.encoder.send_eof()?;
    }

    let fps_int = self.fps.round().max(1.0) as i32;
    let mut packet = ffmpeg::Packet::empty();
    while self.encoder.receive_packet(&mut packet).is_ok() {
      packet.set_stream(self.stream_index);
      packet.rescale_ts(Rational::new(1, fps_int), self.time_base);
      packet.write_interleaved(&mut self.output_context)?;
    }

    Ok(())
  }

  fn write_rgb_frame(&mut self, image: &RgbImage) -> anyhow::Result<()> {
    // 把紧凑的 RGB 缓冲拷入带步长对齐的 FFmpeg 帧
    let mut rgb_frame = Video::new(Pixel::RGB24, self.width, self.height);
    let data = image.as_raw();
    let stride = rgb_frame.stride(0);
    let width = self.width as usize;
    let height = self.height as usize;

    let frame_data = rgb_frame.data_mut(0);
    for y in 0..height {
      let src_start = y * width * 3;
      let dst_start = y * stride;
      frame_data[dst_start..dst_start + width * 3]
        .copy_from_slice(&data[src_start..src_start + width * 3]);
    }

    // 转换为 YUV 并编码
    let mut yuv_frame = Video::empty();
    self.scaler.run(&rgb_frame, &mut yuv_frame)?;

    yuv_frame.set_pts(Some(self.frame_index as i64));
    self.frame_index += 1;

    self.encode_frame(Some(&yuv_frame))
  }
}

impl FrameSink for VideoSink {
  fn write_frame(&mut self, image: &RgbImage) -> Result<()> {
    self.write_rgb_frame(image).map_err(Error::sink_write)
  }

  fn finish(&mut self) -> Result<()> {
    // 冲刷编码器并写入文件尾
    self
      .encode_frame(None)
      .and_then(|_| self.output_context.write_trailer().map_err(Into::into))
      .map_err(Error::sink_write)
  }
}
