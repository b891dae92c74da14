//! FLAC PCM Stream
//!
//! 拉取式流式FLAC解码器：从任意字节源读取FLAC比特流，按需输出16位有符号交错PCM。
//!
//! ## 核心特性
//! - 消费者按需拉取：`step()` 解码一帧，`read()` 取走字节
//! - 任意位深（8-32位）归一化到16位
//! - 长度已知的字节源走原生seek，长度未知时解码并丢弃
//! - 字节源在解码器销毁时恰好释放一次

pub mod audio;
pub mod error;
pub mod processing;
pub mod tools;

// 重新导出核心类型
pub use audio::{
    ByteSource, DecoderState, EngineOptions, FileSource, FlacStreamDecoder, MemorySource,
    ReaderSource, StreamInfo,
};
pub use error::{AudioError, AudioResult, ErrorCategory};
