//! 比特流解码引擎接口
//!
//! 解码引擎（FLAC帧解析、熵解码、预测）是外部协作者，这里只定义协调器与引擎之间的契约：
//!
//! - [`SourceRoles`]：读取/seek/tell/长度/EOF 五个输入角色，在引擎构造时注入
//! - [`OutputRoles`]：写入/元数据/错误 三个输出角色，每次调用引擎时以独占引用传入
//! - [`BitstreamEngine`]：引擎本身暴露的四个操作
//!
//! 引擎只通过这些角色接触字节源与输出缓冲区。

use super::format::StreamInfo;
use std::fmt;

/// 读取角色的返回状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// 读到了 n 字节（n > 0）
    Continue(usize),
    /// 字节源在当前位置已无数据
    EndOfStream,
    /// 字节源读取失败，引擎必须中止
    Abort,
}

/// seek 角色的返回状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekStatus {
    Ok,
    Error,
}

/// 长度角色的返回状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthStatus {
    Known(u64),
    Unsupported,
}

/// 写入角色的返回状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    Continue,
    Abort,
}

/// 引擎交付的元数据块
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataBlock {
    /// 流参数块（唯一需要的块）
    StreamInfo(StreamInfo),
    /// 其他类型的块（已请求引擎忽略，出现即异常）
    Other { block_type: u8 },
}

/// 引擎报告的比特流级错误（仅供诊断）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFault {
    /// 失去帧同步
    LostSync,
    /// 帧头损坏
    BadHeader,
    /// 帧CRC不匹配
    FrameCrcMismatch,
    /// 无法解析的流
    UnparseableStream,
    /// 其他引擎错误
    Corrupt(String),
}

impl fmt::Display for StreamFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamFault::LostSync => write!(f, "lost sync"),
            StreamFault::BadHeader => write!(f, "bad frame header"),
            StreamFault::FrameCrcMismatch => write!(f, "frame CRC mismatch"),
            StreamFault::UnparseableStream => write!(f, "unparseable stream"),
            StreamFault::Corrupt(msg) => write!(f, "corrupt data: {msg}"),
        }
    }
}

/// 输入角色：把引擎的拉取模型映射到字节源契约
pub trait SourceRoles {
    /// 读取最多 `buf.len()` 字节到 `buf`
    fn on_read(&mut self, buf: &mut [u8]) -> ReadStatus;

    /// 引擎自主定位到绝对字节偏移
    fn on_seek(&mut self, absolute_byte_offset: u64) -> SeekStatus;

    /// 当前绝对字节偏移
    fn on_tell(&mut self) -> u64;

    /// 字节源总长度
    fn on_length(&mut self) -> LengthStatus;

    /// 是否已到达字节源末尾
    fn on_eof(&mut self) -> bool;
}

/// 输出角色：接收引擎产出的元数据、音频块与诊断
pub trait OutputRoles {
    /// 元数据块
    fn on_metadata(&mut self, block: MetadataBlock);

    /// 一个解码块：每声道一个 `i32` 平面，样本处于源位深度，`frames` 为每声道样本数
    fn on_write(&mut self, planes: &[&[i32]], frames: usize) -> WriteStatus;

    /// 比特流错误（建议性，不单独终止解码）
    fn on_error(&mut self, fault: StreamFault);
}

/// 比特流解码引擎
///
/// 所有方法的 `bool` 返回值是引擎是否可以继续的权威信号。
pub trait BitstreamEngine {
    /// 处理到元数据结束，期间通过 `on_metadata` 交付 STREAMINFO
    fn process_metadata(&mut self, out: &mut dyn OutputRoles) -> bool;

    /// 处理一个逻辑单元（通常是一帧）；产出音频时恰好调用一次 `on_write`
    fn process_one_frame(&mut self, out: &mut dyn OutputRoles) -> bool;

    /// 定位到绝对样本位置
    ///
    /// 成功后下一次 `process_one_frame` 输出的第一个样本必须恰好是 `sample`；
    /// seek 过程中不得调用 `on_write`。
    fn seek_absolute(&mut self, sample: u64, out: &mut dyn OutputRoles) -> bool;

    /// 回到流起点，下一步需要重新 `process_metadata`
    fn reset(&mut self) -> bool;
}
