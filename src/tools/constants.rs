//! 常量和默认配置集中管理
//!
//! 将所有重要常量集中定义，避免"默认值漂移"和重复定义

/// 输出PCM格式常量
pub mod pcm {
    /// 归一化后每个样本的字节数（固定16位有符号）
    pub const BYTES_PER_SAMPLE: usize = 2;

    /// 输出位深度
    pub const OUTPUT_BITS: u32 = 16;

    /// 可接受的最小源位深度
    pub const MIN_SOURCE_BITS: u32 = 8;

    /// 可接受的最大源位深度
    pub const MAX_SOURCE_BITS: u32 = 32;
}

/// 默认配置值
pub mod defaults {
    /// CLI 每次从解码器拉取的字节数
    ///
    /// 16 KiB 与常见音频输出回调的缓冲大小同量级
    pub const CHUNK_SIZE_BYTES: usize = 16 * 1024;

    /// CLI 允许的最小拉取块大小（至少容纳一个 8 声道 PCM 帧）
    pub const MIN_CHUNK_SIZE_BYTES: usize = 16;
}

/// WAV输出容器设置（CLI `--wav`）
pub mod wav {
    /// 写出的样本格式（与解码器输出一致的16位有符号整数）
    pub const SAMPLE_FORMAT: hound::SampleFormat = hound::SampleFormat::Int;

    /// 写出的位深度
    pub const BITS_PER_SAMPLE: u16 = super::pcm::OUTPUT_BITS as u16;
}
