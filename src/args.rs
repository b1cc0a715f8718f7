// 该文件是 Renliu （人流统计） 项目的一部分。
// src/args.rs - 项目参数配置
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

use clap::Parser;

/// Renliu 人流统计参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// YOLOv8 ONNX 模型文件路径
  #[arg(long, default_value = "yolov8n.onnx", value_name = "FILE")]
  pub model: String,

  /// 输入来源（图片文件、视频文件、V4L2 设备路径或摄像头序号）
  /// 支持格式:
  /// - 图片: *.jpg, *.jpeg, *.png, *.bmp, *.gif, *.webp
  /// - 视频: *.mp4, *.avi, *.mkv 等
  /// - 摄像头: 0、/dev/video0 或 v4l2:///dev/video0
  #[arg(long, value_name = "SOURCE")]
  pub input: String,

  /// 输出文件路径（可选）
  /// 支持格式:
  /// - 图片: *.jpg, *.jpeg, *.png, *.bmp
  /// - 视频: *.mp4, *.avi, *.mkv 等
  #[arg(long, value_name = "OUTPUT")]
  pub output: Option<String>,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.25", value_name = "THRESHOLD")]
  pub confidence: f32,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.45", value_name = "THRESHOLD")]
  pub nms_threshold: f32,

  /// 计为 “人” 的类别序号（COCO 中 person 为 0）
  #[arg(long, default_value = "0", value_name = "CLASS")]
  pub person_class: usize,

  /// 最大处理帧数（仅对视频/摄像头有效，0 表示无限制）
  #[arg(long, default_value = "0", value_name = "COUNT")]
  pub max_frames: u64,

  /// 打开实时显示窗口（需要启用 display 特性编译）
  #[arg(long)]
  pub display: bool,
}
