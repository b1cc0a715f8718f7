// 该文件是 Renliu （人流统计） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use renliu::counter::PeopleCounter;
use renliu::detector::YoloDetector;
use renliu::input::{InputSourceType, create_input_source};
use renliu::output::{FrameSink, create_file_sink};
use renliu::runner::StreamRunner;

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let args = args::Args::parse();

  #[cfg(not(feature = "display"))]
  if args.display {
    anyhow::bail!("--display 需要启用 display 特性编译");
  }

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("置信度阈值: {}", args.confidence);
  info!("NMS 阈值: {}", args.nms_threshold);

  // 加载模型（失败即终止，不进入流处理）
  info!("正在加载模型...");
  let detector = YoloDetector::new(&args.model, args.confidence, args.nms_threshold)?;
  info!("模型加载完成");

  // 打开输入源
  info!("正在打开输入源...");
  let mut source = create_input_source(&args.input)?;
  info!(
    "输入源已打开: {}x{} {}",
    source.width(),
    source.height(),
    match source.source_type() {
      InputSourceType::Image => "图片",
      InputSourceType::Video => "视频",
      InputSourceType::Camera => "V4L2 摄像头",
    }
  );

  // 创建输出
  let mut sinks: Vec<Box<dyn FrameSink>> = Vec::new();
  if let Some(output) = &args.output {
    info!("正在创建输出: {}", output);
    sinks.push(create_file_sink(
      output,
      source.width(),
      source.height(),
      source.fps(),
    )?);
  }

  #[cfg(feature = "display")]
  if args.display {
    info!("正在打开显示窗口...");
    sinks.push(Box::new(renliu::output::DisplaySink::new(
      source.width(),
      source.height(),
      source.fps().unwrap_or(30.0),
    )?));
  }

  // 取消信号: Ctrl-C 触发，循环内每帧检查一次
  let (tx, rx) = mpsc::channel();
  ctrlc::set_handler(move || {
    let _ = tx.send(());
    thread::spawn(|| {
      thread::sleep(Duration::from_secs(30));
      warn!("强制退出程序");
      std::process::exit(1);
    });
  })
  .context("无法设置 Ctrl-C 处理器")?;

  let counter = PeopleCounter::new(detector, args.person_class);
  let mut runner = StreamRunner::new(counter).with_max_frames(args.max_frames);

  runner.run(source.as_mut(), &mut sinks, &rx)?;

  Ok(())
}
