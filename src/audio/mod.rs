//! 音频解码模块
//!
//! 拉取式FLAC流解码：字节源契约、输出缓冲区、引擎契约与协调器。
//!
//! **使用 `FlacStreamDecoder`** - 唯一的消费者入口，默认由 symphonia 引擎驱动

// 内部子模块（仅供协调器与引擎使用）
mod cursor;
mod growing_buffer;
mod stats;

pub mod engine;
pub mod format;
pub mod source;
pub mod stream_decoder;
pub mod symphonia_engine;

pub use cursor::SourceCursor;
pub use engine::{
    BitstreamEngine, LengthStatus, MetadataBlock, OutputRoles, ReadStatus, SeekStatus,
    SourceRoles, StreamFault, WriteStatus,
};
pub use format::StreamInfo;
pub use growing_buffer::GrowingBuffer;
pub use source::{ByteSource, FileSource, MemorySource, ReaderSource};
pub use stats::BlockStats;
pub use stream_decoder::{DecoderState, FlacStreamDecoder};
pub use symphonia_engine::{EngineOptions, SymphoniaFlacEngine};
