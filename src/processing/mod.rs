//! 样本处理模块
//!
//! 位深归一化：源位深整数平面 → 交错16位PCM

pub mod sample_conversion;

pub use sample_conversion::{BitShift, normalize_block, pcm_bytes_to_i16};
