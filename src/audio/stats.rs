//! 解码块统计模块
//!
//! 统计写入角色收到的块大小（每声道样本数），用于CLI诊断输出

use serde::Serialize;

/// 解码块统计信息
#[derive(Debug, Clone, Serialize)]
pub struct BlockStats {
    pub total_blocks: usize,
    pub total_frames: u64,
    pub min_size: usize,
    pub max_size: usize,
}

impl Default for BlockStats {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockStats {
    pub fn new() -> Self {
        Self {
            total_blocks: 0,
            total_frames: 0,
            min_size: usize::MAX,
            max_size: 0,
        }
    }

    /// 记录一个块
    ///
    /// # 参数
    /// * `frames` - 块大小（每声道样本数，非交错样本总数）
    pub fn add_block(&mut self, frames: usize) {
        self.total_blocks += 1;
        self.total_frames = self.total_frames.saturating_add(frames as u64);
        self.min_size = self.min_size.min(frames);
        self.max_size = self.max_size.max(frames);
    }

    /// 平均块大小，无数据时为 0.0
    pub fn mean_size(&self) -> f64 {
        if self.total_blocks == 0 {
            0.0
        } else {
            self.total_frames as f64 / self.total_blocks as f64
        }
    }

    /// 最小块大小，无数据时为 0
    pub fn min_size_or_zero(&self) -> usize {
        if self.total_blocks == 0 {
            0
        } else {
            self.min_size
        }
    }
}
