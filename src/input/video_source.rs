// 该文件是 Renliu （人流统计） 项目的一部分。
// src/input/video_source.rs - 视频输入源
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

use anyhow::Context;
use ffmpeg_next as ffmpeg;
use ffmpeg_next::format::{Pixel, input};
use ffmpeg_next::media::Type;
use ffmpeg_next::software::scaling::{context::Context as ScalingContext, flag::Flags};
use ffmpeg_next::util::frame::video::Video;
use image::RgbImage;

use super::{Frame, InputSource, InputSourceType};
use crate::error::{Error, Result};

/// 视频输入源
///
/// 通过 FFmpeg 解封装、解码视频文件，逐帧转换为 RGB 图像。
pub struct VideoSource {
  /// FFmpeg 输入上下文
  input_context: ffmpeg::format::context::Input,
  /// 视频流序号
  video_stream_index: usize,
  /// 视频解码器
  decoder: ffmpeg::decoder::Video,
  /// 缩放上下文（解码像素格式 -> RGB24）
  scaler: ScalingContext,
  /// 帧序号
  frame_index: u64,
  /// 视频宽度
  width: u32,
  /// 视频高度
  height: u32,
  /// 帧率
  fps: f64,
  /// 时间基准
  time_base: f64,
  /// 是否已向解码器发送 EOF
  eof_sent: bool,
  /// 是否结束
  finished: bool,
}

impl VideoSource {
  /// 创建一个新的视频输入源
  pub fn new(path: &str) -> Result<Self> {
    Self::open(path).map_err(|e| Error::source_open(path, e))
  }

  fn open(path: &str) -> anyhow::Result<Self> {
    ffmpeg::init().context("无法初始化 FFmpeg")?;

    let input_context = input(&path).context("无法打开视频文件")?;

    let video_stream = input_context
      .streams()
      .best(Type::Video)
      .context("找不到视频流")?;

    let video_stream_index = video_stream.index();
    let context_decoder =
      ffmpeg::codec::context::Context::from_parameters(video_stream.parameters())?;
    let decoder = context_decoder.decoder().video()?;

    let width = decoder.width();
    let height = decoder.height();

    let fps = video_stream.avg_frame_rate();
    let fps = if fps.denominator() != 0 {
      fps.numerator() as f64 / fps.denominator() as f64
    } else {
      0.0
    };

    let time_base = video_stream.time_base();
    let time_base = time_base.numerator() as f64 / time_base.denominator() as f64;

    let scaler = ScalingContext::get(
      decoder.format(),
      width,
      height,
      Pixel::RGB24,
      width,
      height,
      Flags::BILINEAR,
    )?;

    Ok(Self {
      input_context,
      video_stream_index,
      decoder,
      scaler,
      frame_index: 0,
      width,
      height,
      fps,
      time_base,
      eof_sent: false,
      finished: false,
    })
  }

  /// 解码下一帧
  ///
  /// 先从解码器取已解码的帧；没有则继续送入数据包。
  /// 数据包读完之后送 EOF 并清空解码器缓冲。
  fn decode_next_frame(&mut self) -> anyhow::Result<Option<Video>> {
    loop {
      let mut decoded = Video::empty();
      if self.decoder.receive_frame(&mut decoded).is_ok() {
        return Ok(Some(decoded));
      }

      if self.eof_sent {
        return Ok(None);
      }

      // 读取下一个属于视频流的数据包
      let mut packet_sent = false;
      for (stream, packet) in self.input_context.packets() {
        if stream.index() == self.video_stream_index {
          self.decoder.send_packet(&packet)?;
          packet_sent = true;
          break;
        }
      }

      if !packet_sent {
        self.decoder.send_eof()?;
        self.eof_sent = true;
      }
    }
  }

  /// 把带步长对齐的 RGB24 平面拷贝成紧凑的图像缓冲
  fn frame_to_image(&self, rgb_frame: &Video) -> anyhow::Result<RgbImage> {
    let data = rgb_frame.data(0);
    let stride = rgb_frame.stride(0);
    let width = self.width as usize;
    let height = self.height as usize;

    let mut image_data = Vec::with_capacity(width * height * 3);
    for y in 0..height {
      let row_start = y * stride;
      image_data.extend_from_slice(&data[row_start..row_start + width * 3]);
    }

    RgbImage::from_raw(self.width, self.height, image_data)
      .context("无法创建 RGB 图像")
  }
}

impl Iterator for VideoSource {
  type Item = anyhow::Result<Frame>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.finished {
      return None;
    }

    match self.decode_next_frame() {
      Ok(Some(decoded)) => {
        let mut rgb_frame = Video::empty();
        if let Err(e) = self.scaler.run(&decoded, &mut rgb_frame) {
          self.finished = true;
          return Some(Err(e.into()));
        }

        let image = match self.frame_to_image(&rgb_frame) {
          Ok(image) => image,
          Err(e) => {
            self.finished = true;
            return Some(Err(e));
          }
        };

        let timestamp_ms = decoded
          .timestamp()
          .map_or(0, |ts| (ts as f64 * self.time_base * 1000.0) as u64);

        let frame = Frame {
          image,
          index: self.frame_index,
          timestamp_ms,
        };

        self.frame_index += 1;
        Some(Ok(frame))
      }
      Ok(None) => {
        self.finished = true;
        None
      }
      Err(e) => {
        self.finished = true;
        Some(Err(e))
      }
    }
  }
}

impl InputSource for VideoSource {
  fn source_type(&self) -> InputSourceType {
    InputSourceType::Video
  }

  fn width(&self) -> u32 {
    self.width
  }

  fn height(&self) -> u32 {
    self.height
  }

  fn fps(&self) -> Option<f64> {
    if self.fps > 0.0 { Some(self.fps) } else { None }
  }
}
