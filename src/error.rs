// 该文件是 Renliu （人流统计） 项目的一部分。
// src/error.rs - 错误类型定义
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

use thiserror::Error;

pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// 管线各阶段的错误类型
///
/// 每个变体对应管线的一个阶段，错误信息指明出错的阶段。
/// 所有错误都不重试，直接向调用方传播。
#[derive(Debug, Error)]
pub enum Error {
  /// 模型权重无法加载，发生在构造阶段，致命
  #[error("model load error: {path}")]
  ModelLoad {
    path: String,
    #[source]
    source: BoxedError,
  },

  /// 输入源无法打开（路径无效或摄像头不可用）
  #[error("source open error: {source_id}")]
  SourceOpen {
    source_id: String,
    #[source]
    source: BoxedError,
  },

  /// 推理阶段失败
  #[error("inference error")]
  Inference(#[source] BoxedError),

  /// 输出写入失败
  #[error("sink write error")]
  SinkWrite(#[source] BoxedError),
}

impl Error {
  pub fn model_load(path: impl Into<String>, source: impl Into<BoxedError>) -> Self {
    Self::ModelLoad {
      path: path.into(),
      source: source.into(),
    }
  }

  pub fn source_open(source_id: impl Into<String>, source: impl Into<BoxedError>) -> Self {
    Self::SourceOpen {
      source_id: source_id.into(),
      source: source.into(),
    }
  }

  pub fn inference(source: impl Into<BoxedError>) -> Self {
    Self::Inference(source.into())
  }

  pub fn sink_write(source: impl Into<BoxedError>) -> Self {
    Self::SinkWrite(source.into())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
