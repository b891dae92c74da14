//! 流参数模块
//!
//! 定义STREAMINFO对应的流参数结构及其校验规则

use crate::error::{self, AudioResult};
use crate::tools::constants::pcm;
use serde::Serialize;

/// 流参数（来自首个STREAMINFO元数据块）
///
/// 每个解码器实例只填充一次；之后重复出现的STREAMINFO会被忽略。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamInfo {
    /// 总样本数（每声道），0 表示未知（直播流/流式写入）
    pub total_samples: u64,
    pub sample_rate: u32,
    pub channels: u32,
    /// 源位深度，合法范围 [8, 32]
    pub bits_per_sample: u32,
}

impl StreamInfo {
    /// 创建新的流参数
    pub fn new(total_samples: u64, sample_rate: u32, channels: u32, bits_per_sample: u32) -> Self {
        Self {
            total_samples,
            sample_rate,
            channels,
            bits_per_sample,
        }
    }

    /// 验证流参数的有效性
    pub fn validate(&self) -> AudioResult<()> {
        if self.channels == 0 {
            return Err(error::format_error("声道数不能为0", self.channels));
        }
        if !(pcm::MIN_SOURCE_BITS..=pcm::MAX_SOURCE_BITS).contains(&self.bits_per_sample) {
            return Err(error::format_error(
                "不支持的位深度",
                format!(
                    "{}位（仅支持 {}-{}）",
                    self.bits_per_sample,
                    pcm::MIN_SOURCE_BITS,
                    pcm::MAX_SOURCE_BITS
                ),
            ));
        }
        Ok(())
    }

    /// 总样本数是否已知
    #[inline]
    pub fn has_known_length(&self) -> bool {
        self.total_samples > 0
    }

    /// 一个PCM帧（所有声道各一个样本）归一化后的字节数
    #[inline]
    pub fn pcm_frame_bytes(&self) -> u64 {
        self.channels as u64 * pcm::BYTES_PER_SAMPLE as u64
    }

    /// 归一化后整条流的PCM字节数（总样本数未知时为 None）
    pub fn pcm_len_bytes(&self) -> Option<u64> {
        self.has_known_length()
            .then(|| self.total_samples.saturating_mul(self.pcm_frame_bytes()))
    }

    /// 获取持续时长（秒），未知时返回 0.0
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.total_samples as f64 / self.sample_rate as f64
    }
}
