//! 字节源游标
//!
//! 把 [`ByteSource`] 适配为引擎的五个输入角色，并跟踪当前读取偏移与EOF标志。
//! 游标句柄可克隆：引擎持有一份用于读取，协调器持有一份用于查询EOF状态。
//! 内部的 `Mutex` 只为满足 symphonia `MediaSource: Send + Sync` 的约束，调用始终是串行的。

use super::engine::{LengthStatus, ReadStatus, SeekStatus, SourceRoles};
use super::source::ByteSource;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error};

struct CursorState {
    source: Box<dyn ByteSource>,
    /// 长度在构造时查询并缓存
    length: Option<u64>,
    offset: u64,
    end_of_source: bool,
    source_reads: u64,
}

impl Drop for CursorState {
    fn drop(&mut self) {
        debug!(
            "释放字节源 / releasing byte source (reads={})",
            self.source_reads
        );
        self.source.release();
    }
}

/// 共享字节源游标
///
/// 最后一个句柄被丢弃时调用 `ByteSource::release`，保证恰好一次且在所有读取之后。
#[derive(Clone)]
pub struct SourceCursor {
    state: Arc<Mutex<CursorState>>,
}

impl SourceCursor {
    /// 包装字节源并缓存其长度
    pub fn new(source: Box<dyn ByteSource>) -> Self {
        let length = source.size();
        Self {
            state: Arc::new(Mutex::new(CursorState {
                source,
                length,
                offset: 0,
                end_of_source: false,
                source_reads: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CursorState> {
        // 串行访问下不会出现中毒；即便出现也沿用内部状态
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 缓存的字节源长度
    pub fn length(&self) -> Option<u64> {
        self.lock().length
    }

    /// 当前读取偏移
    pub fn offset(&self) -> u64 {
        self.lock().offset
    }

    /// 是否已读到字节源末尾
    pub fn is_end_of_source(&self) -> bool {
        self.lock().end_of_source
    }

    /// 回到起点并清除EOF标志
    pub fn rewind(&self) {
        let mut state = self.lock();
        state.offset = 0;
        state.end_of_source = false;
    }

    /// 累计调用 `ByteSource::read_at` 的次数
    pub fn source_reads(&self) -> u64 {
        self.lock().source_reads
    }
}

impl SourceRoles for SourceCursor {
    fn on_read(&mut self, buf: &mut [u8]) -> ReadStatus {
        let mut state = self.lock();
        if buf.is_empty() {
            return ReadStatus::Continue(0);
        }
        state.source_reads += 1;
        let offset = state.offset;
        match state.source.read_at(offset, buf) {
            Ok(0) => {
                state.end_of_source = true;
                ReadStatus::EndOfStream
            }
            Ok(n) => {
                state.offset += n as u64;
                ReadStatus::Continue(n)
            }
            Err(e) => {
                error!("字节源读取失败 / byte source read failed at {offset}: {e}");
                ReadStatus::Abort
            }
        }
    }

    fn on_seek(&mut self, absolute_byte_offset: u64) -> SeekStatus {
        let mut state = self.lock();
        state.offset = absolute_byte_offset;
        state.end_of_source = false;
        SeekStatus::Ok
    }

    fn on_tell(&mut self) -> u64 {
        self.lock().offset
    }

    fn on_length(&mut self) -> LengthStatus {
        match self.lock().length {
            Some(len) => LengthStatus::Known(len),
            None => LengthStatus::Unsupported,
        }
    }

    fn on_eof(&mut self) -> bool {
        self.lock().end_of_source
    }
}
