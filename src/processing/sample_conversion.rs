//! 位深归一化模块
//!
//! 将引擎输出的源位深整数样本（按声道分平面）转换为交错的16位有符号PCM。
//! 这是唯一发生位深收窄的地方，转换是有损且单向的。

use crate::tools::constants::pcm;

/// 位深移位方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitShift {
    /// 源位深 ≤ 16：左移补齐
    Left(u32),
    /// 源位深 > 16：算术右移截断
    Right(u32),
}

impl BitShift {
    /// 根据源位深计算移位
    #[inline]
    pub fn for_source_bits(bits_per_sample: u32) -> Self {
        if bits_per_sample <= pcm::OUTPUT_BITS {
            BitShift::Left(pcm::OUTPUT_BITS - bits_per_sample)
        } else {
            BitShift::Right(bits_per_sample - pcm::OUTPUT_BITS)
        }
    }

    /// 归一化单个样本
    #[inline]
    pub fn apply(self, sample: i32) -> i16 {
        match self {
            BitShift::Left(shift) => (sample << shift) as i16,
            BitShift::Right(shift) => (sample >> shift) as i16,
        }
    }
}

/// 把一个解码块写成交错的16位PCM字节（本机字节序）
///
/// `out` 长度必须为 `frames * planes.len() * 2`。
pub fn normalize_block(planes: &[&[i32]], frames: usize, bits_per_sample: u32, out: &mut [u8]) {
    let shift = BitShift::for_source_bits(bits_per_sample);
    let channels = planes.len();
    debug_assert_eq!(out.len(), frames * channels * pcm::BYTES_PER_SAMPLE);

    for (frame, dst) in out
        .chunks_exact_mut(channels * pcm::BYTES_PER_SAMPLE)
        .take(frames)
        .enumerate()
    {
        for (plane, bytes) in planes
            .iter()
            .zip(dst.chunks_exact_mut(pcm::BYTES_PER_SAMPLE))
        {
            bytes.copy_from_slice(&shift.apply(plane[frame]).to_ne_bytes());
        }
    }
}

/// 把交错的16位PCM字节还原为样本（CLI写WAV与测试使用）
pub fn pcm_bytes_to_i16(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(pcm::BYTES_PER_SAMPLE)
        .map(|pair| i16::from_ne_bytes([pair[0], pair[1]]))
        .collect()
}
