// 该文件是 Renliu （人流统计） 项目的一部分。
// src/runner.rs - 流处理驱动
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

use std::sync::mpsc::Receiver;

use tracing::{info, warn};

use crate::counter::PeopleCounter;
use crate::detector::Detector;
use crate::error::Result;
use crate::input::InputSource;
use crate::output::FrameSink;

/// 流处理驱动
///
/// 单线程同步拉取循环：逐帧从输入源取帧，交给统计器处理，
/// 再把标注后的帧写入各输出器。一帧完整处理完毕才拉取下一帧。
/// 取消信号每轮循环检查一次，收到后按正常结束处理；
/// 读取失败不重试，直接结束循环。无论以哪种方式退出，
/// 输入输出句柄都随本次运行释放。
pub struct StreamRunner<D> {
  /// 单帧人数统计器
  counter: PeopleCounter<D>,
  /// 最大处理帧数，0 表示无限制
  max_frames: u64,
}

impl<D: Detector> StreamRunner<D> {
  /// 创建一个新的流处理驱动
  pub fn new(counter: PeopleCounter<D>) -> Self {
    Self {
      counter,
      max_frames: 0,
    }
  }

  pub fn with_max_frames(mut self, max_frames: u64) -> Self {
    self.max_frames = max_frames;
    self
  }

  /// 运行拉取循环，返回处理的总帧数
  ///
  /// 推理错误和写入错误向上传播并终止本次运行；
  /// 源耗尽、读取失败和取消信号都走正常的清理路径。
  /// 无论循环如何退出，所有输出器都会被收尾。
  pub fn run(
    &mut self,
    source: &mut dyn InputSource,
    sinks: &mut [Box<dyn FrameSink>],
    cancel: &Receiver<()>,
  ) -> Result<u64> {
    let result = self.pull_loop(source, sinks, cancel);

    // 不论循环以何种方式退出，每个输出器都要收尾；
    // 视频输出器未写尾部时文件不可播放
    for sink in sinks.iter_mut() {
      if let Err(e) = sink.finish() {
        if result.is_ok() {
          return Err(e);
        }
        warn!("输出器收尾失败: {}", e);
      }
    }

    let frames = result?;
    info!("处理完成，共 {} 帧", frames);
    Ok(frames)
  }

  fn pull_loop(
    &mut self,
    source: &mut dyn InputSource,
    sinks: &mut [Box<dyn FrameSink>],
    cancel: &Receiver<()>,
  ) -> Result<u64> {
    let mut frames = 0u64;

    loop {
      if self.max_frames > 0 && frames >= self.max_frames {
        info!("已达到最大帧数限制: {}", self.max_frames);
        break;
      }

      let mut frame = match source.next() {
        Some(Ok(frame)) => frame,
        Some(Err(e)) => {
          warn!("读取帧失败，停止处理: {:#}", e);
          break;
        }
        None => break,
      };

      let count = self.counter.process(&mut frame.image)?;
      info!("帧 {}: 人数 {}", frame.index, count);

      for sink in sinks.iter_mut() {
        sink.write_frame(&frame.image)?;
      }

      frames += 1;

      if cancel.try_recv().is_ok() {
        info!("收到取消信号，停止处理");
        break;
      }
    }

    Ok(frames)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::mpsc;
  use std::sync::{Arc, Mutex};

  use image::RgbImage;

  use super::*;
  use crate::detector::Detection;
  use crate::error::Error;
  use crate::input::{Frame, InputSourceType};

  /// 固定帧数的输入源
  struct StubSource {
    frames: Vec<Frame>,
  }

  impl StubSource {
    fn with_frames(n: usize) -> Self {
      let frames = (0..n)
        .map(|i| Frame {
          image: RgbImage::new(64, 48),
          index: i as u64,
          timestamp_ms: i as u64 * 40,
        })
        .collect();
      Self { frames }
    }
  }

  impl Iterator for StubSource {
    type Item = anyhow::Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
      if self.frames.is_empty() {
        None
      } else {
        Some(Ok(self.frames.remove(0)))
      }
    }
  }

  impl InputSource for StubSource {
    fn source_type(&self) -> InputSourceType {
      InputSourceType::Video
    }

    fn width(&self) -> u32 {
      64
    }

    fn height(&self) -> u32 {
      48
    }

    fn fps(&self) -> Option<f64> {
      Some(25.0)
    }
  }

  /// 记录调用次数的检测器
  struct CountingDetector {
    calls: Arc<AtomicUsize>,
  }

  impl Detector for CountingDetector {
    fn detect(&mut self, _image: &RgbImage) -> Result<Vec<Detection>> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      Ok(vec![])
    }
  }

  /// 记录写入与完成状态的输出器
  #[derive(Default)]
  struct RecordingSinkState {
    written: usize,
    finished: bool,
  }

  struct RecordingSink {
    state: Arc<Mutex<RecordingSinkState>>,
  }

  impl FrameSink for RecordingSink {
    fn write_frame(&mut self, _image: &RgbImage) -> Result<()> {
      self.state.lock().unwrap().written += 1;
      Ok(())
    }

    fn finish(&mut self) -> Result<()> {
      self.state.lock().unwrap().finished = true;
      Ok(())
    }
  }

  /// 写入即失败的输出器
  struct FailingSink {
    finished: Arc<Mutex<bool>>,
  }

  impl FrameSink for FailingSink {
    fn write_frame(&mut self, _image: &RgbImage) -> Result<()> {
      Err(Error::sink_write("磁盘已满"))
    }

    fn finish(&mut self) -> Result<()> {
      *self.finished.lock().unwrap() = true;
      Ok(())
    }
  }

  fn runner(calls: &Arc<AtomicUsize>) -> StreamRunner<CountingDetector> {
    let detector = CountingDetector {
      calls: calls.clone(),
    };
    StreamRunner::new(PeopleCounter::new(detector, 0))
  }

  #[test]
  fn empty_source_drains_without_processing() {
    let calls = Arc::new(AtomicUsize::new(0));
    let state = Arc::new(Mutex::new(RecordingSinkState::default()));
    let mut sinks: Vec<Box<dyn FrameSink>> = vec![Box::new(RecordingSink {
      state: state.clone(),
    })];
    let (_tx, rx) = mpsc::channel();

    let frames = runner(&calls)
      .run(&mut StubSource::with_frames(0), &mut sinks, &rx)
      .unwrap();

    assert_eq!(frames, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    let state = state.lock().unwrap();
    assert_eq!(state.written, 0);
    assert!(state.finished);
  }

  #[test]
  fn processes_every_frame_and_finishes_sinks() {
    let calls = Arc::new(AtomicUsize::new(0));
    let state = Arc::new(Mutex::new(RecordingSinkState::default()));
    let mut sinks: Vec<Box<dyn FrameSink>> = vec![Box::new(RecordingSink {
      state: state.clone(),
    })];
    let (_tx, rx) = mpsc::channel();

    let frames = runner(&calls)
      .run(&mut StubSource::with_frames(5), &mut sinks, &rx)
      .unwrap();

    assert_eq!(frames, 5);
    assert_eq!(calls.load(Ordering::SeqCst), 5);
    let state = state.lock().unwrap();
    assert_eq!(state.written, 5);
    assert!(state.finished);
  }

  #[test]
  fn cancellation_stops_after_current_frame() {
    let calls = Arc::new(AtomicUsize::new(0));
    let state = Arc::new(Mutex::new(RecordingSinkState::default()));
    let mut sinks: Vec<Box<dyn FrameSink>> = vec![Box::new(RecordingSink {
      state: state.clone(),
    })];
    let (tx, rx) = mpsc::channel();

    // 信号在循环开始前就绪：第一帧写入完成后即停止
    tx.send(()).unwrap();

    let frames = runner(&calls)
      .run(&mut StubSource::with_frames(10), &mut sinks, &rx)
      .unwrap();

    assert_eq!(frames, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let state = state.lock().unwrap();
    assert_eq!(state.written, 1);
    assert!(state.finished);
  }

  #[test]
  fn max_frames_limits_the_run() {
    let calls = Arc::new(AtomicUsize::new(0));
    let state = Arc::new(Mutex::new(RecordingSinkState::default()));
    let mut sinks: Vec<Box<dyn FrameSink>> = vec![Box::new(RecordingSink {
      state: state.clone(),
    })];
    let (_tx, rx) = mpsc::channel();

    let frames = runner(&calls)
      .with_max_frames(3)
      .run(&mut StubSource::with_frames(10), &mut sinks, &rx)
      .unwrap();

    assert_eq!(frames, 3);
    assert_eq!(state.lock().unwrap().written, 3);
  }

  #[test]
  fn sink_write_error_aborts_the_run() {
    let calls = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(Mutex::new(false));
    let mut sinks: Vec<Box<dyn FrameSink>> = vec![Box::new(FailingSink {
      finished: finished.clone(),
    })];
    let (_tx, rx) = mpsc::channel();

    let result = runner(&calls).run(&mut StubSource::with_frames(4), &mut sinks, &rx);

    assert!(matches!(result, Err(Error::SinkWrite(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn sinks_are_finished_even_when_a_write_fails() {
    let calls = Arc::new(AtomicUsize::new(0));
    let failing_finished = Arc::new(Mutex::new(false));
    let state = Arc::new(Mutex::new(RecordingSinkState::default()));
    let mut sinks: Vec<Box<dyn FrameSink>> = vec![
      Box::new(FailingSink {
        finished: failing_finished.clone(),
      }),
      Box::new(RecordingSink {
        state: state.clone(),
      }),
    ];
    let (_tx, rx) = mpsc::channel();

    let result = runner(&calls).run(&mut StubSource::with_frames(4), &mut sinks, &rx);

    // 写入失败终止本次运行，但两个输出器都完成了收尾
    assert!(matches!(result, Err(Error::SinkWrite(_))));
    assert!(*failing_finished.lock().unwrap());
    assert!(state.lock().unwrap().finished);
  }
}
