//! 增长型输出缓冲区
//!
//! 尾部追加、头部消费的FIFO字节缓冲。头部移除后剩余字节整体前移（压缩而非环形），
//! 保证下一次追加总是连续落在 `len` 处。容量只增不减，避免seek之间的反复分配。

use crate::error::{AudioError, AudioResult};

/// 增长型字节缓冲区（非线程安全，由单个解码器独占）
#[derive(Debug, Default)]
pub struct GrowingBuffer {
    data: Vec<u8>,
}

impl GrowingBuffer {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// 在尾部预留 `n` 字节并立即计入长度
    ///
    /// 分配失败时返回 [`AudioError::OutOfMemory`]，缓冲区状态保持不变。
    /// 返回的区域已清零，调用方需在其他操作之前同步填充。
    pub fn claim_for_write(&mut self, n: usize) -> AudioResult<&mut [u8]> {
        self.data
            .try_reserve(n)
            .map_err(|_| AudioError::OutOfMemory)?;
        let start = self.data.len();
        self.data.resize(start + n, 0);
        Ok(&mut self.data[start..])
    }

    /// 拷贝 `min(dest.len(), len)` 字节到 `dest` 并从头部移除，返回拷贝数
    pub fn consume(&mut self, dest: &mut [u8]) -> usize {
        let n = dest.len().min(self.data.len());
        if n == 0 {
            return 0;
        }
        dest[..n].copy_from_slice(&self.data[..n]);
        self.discard(n)
    }

    /// 从头部丢弃最多 `n` 字节（不拷贝），返回实际移除数
    pub fn discard(&mut self, n: usize) -> usize {
        let n = n.min(self.data.len());
        if n == 0 {
            return 0;
        }
        let remaining = self.data.len() - n;
        self.data.copy_within(n.., 0);
        self.data.truncate(remaining);
        n
    }

    /// 逻辑清空，保留容量
    pub fn clear(&mut self) {
        self.data.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }
}
