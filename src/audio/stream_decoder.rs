//! 流式解码协调器
//!
//! 协调三个独立节拍的协议：按需拉取的消费者、推送式的引擎写回调、以及可能只进的字节源。
//!
//! # 使用示例
//!
//! ```ignore
//! let mut decoder = FlacStreamDecoder::open(FileSource::open("track.flac")?)?;
//! decoder.seek_to(44_100);
//!
//! let mut chunk = vec![0u8; 4096];
//! loop {
//!     let n = decoder.read(&mut chunk);
//!     if n > 0 {
//!         sink.write_all(&chunk[..n])?;
//!     } else if !decoder.step() {
//!         break;
//!     }
//! }
//! ```

use super::cursor::SourceCursor;
use super::engine::{BitstreamEngine, MetadataBlock, OutputRoles, StreamFault, WriteStatus};
use super::format::StreamInfo;
use super::growing_buffer::GrowingBuffer;
use super::source::ByteSource;
use super::stats::BlockStats;
use super::symphonia_engine::{EngineOptions, SymphoniaFlacEngine};
use crate::error::{self, AudioResult};
use crate::processing::sample_conversion::normalize_block;
use crate::tools::constants::pcm;
use tracing::{debug, error, warn};

/// 解码器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// 尚未完成元数据解析
    Uninitialized,
    /// 可以继续解码
    Ready,
    /// 字节源已读尽，缓冲区可能仍有数据
    EndOfSource,
    /// 终止状态：`step()` 不再产生数据，直到下一次 seek
    Finished,
}

/// 输出侧状态，实现引擎的写入/元数据/错误角色
struct PcmSink {
    buffer: GrowingBuffer,
    info: Option<StreamInfo>,
    called_write: bool,
    stats: BlockStats,
    last_fault: Option<StreamFault>,
    fault_count: u64,
}

impl PcmSink {
    fn new() -> Self {
        Self {
            buffer: GrowingBuffer::new(),
            info: None,
            called_write: false,
            stats: BlockStats::new(),
            last_fault: None,
            fault_count: 0,
        }
    }
}

impl OutputRoles for PcmSink {
    fn on_metadata(&mut self, block: MetadataBlock) {
        match block {
            MetadataBlock::StreamInfo(info) => {
                if self.info.is_some() {
                    debug!("忽略重复的STREAMINFO / ignoring repeated STREAMINFO");
                    return;
                }
                debug!(
                    "STREAMINFO: {} Hz, {} ch, {} bits, {} samples",
                    info.sample_rate, info.channels, info.bits_per_sample, info.total_samples
                );
                self.info = Some(info);
            }
            MetadataBlock::Other { block_type } => {
                warn!("多余的元数据块 / unexpected metadata block, type: {block_type}");
            }
        }
    }

    fn on_write(&mut self, planes: &[&[i32]], frames: usize) -> WriteStatus {
        self.called_write = true;

        let Some(info) = self.info else {
            error!("STREAMINFO之前收到音频块 / audio block before STREAMINFO");
            return WriteStatus::Abort;
        };
        let channels = info.channels as usize;
        if planes.len() != channels || planes.iter().any(|plane| plane.len() < frames) {
            error!(
                "音频块形状不符 / block shape mismatch: {} planes for {channels} channels, {frames} frames",
                planes.len()
            );
            return WriteStatus::Abort;
        }

        let Some(bytes) = frames
            .checked_mul(channels)
            .and_then(|n| n.checked_mul(pcm::BYTES_PER_SAMPLE))
        else {
            return WriteStatus::Abort;
        };

        match self.buffer.claim_for_write(bytes) {
            Ok(region) => {
                normalize_block(planes, frames, info.bits_per_sample, region);
                self.stats.add_block(frames);
                WriteStatus::Continue
            }
            Err(e) => {
                error!("无法扩展输出缓冲区 / cannot grow output buffer by {bytes} bytes: {e}");
                WriteStatus::Abort
            }
        }
    }

    fn on_error(&mut self, fault: StreamFault) {
        // 仅诊断；引擎每次调用的返回值才决定是否继续
        warn!("解码引擎报告错误 / engine reported: {fault}");
        self.fault_count += 1;
        self.last_fault = Some(fault);
    }
}

/// 拉取式FLAC流解码器
///
/// 独占字节源、输出缓冲区和解码引擎。所有操作必须由调用方串行化，
/// 不提供内部同步，也不创建线程。丢弃解码器即释放字节源（恰好一次）。
pub struct FlacStreamDecoder<E: BitstreamEngine = SymphoniaFlacEngine> {
    engine: E,
    cursor: SourceCursor,
    sink: PcmSink,
    source_length: Option<u64>,
    requested_sample: u64,
    bytes_since_request: u64,
    finished: bool,
    initialized: bool,
}

impl FlacStreamDecoder<SymphoniaFlacEngine> {
    /// 使用默认的 symphonia FLAC 引擎打开字节源
    pub fn open(source: impl ByteSource + 'static) -> AudioResult<Self> {
        Self::open_with_options(source, EngineOptions::default())
    }

    /// 使用指定引擎选项打开字节源
    pub fn open_with_options(
        source: impl ByteSource + 'static,
        options: EngineOptions,
    ) -> AudioResult<Self> {
        Self::open_with_engine(source, |cursor| {
            Ok(SymphoniaFlacEngine::new(cursor, options))
        })
    }
}

impl<E: BitstreamEngine> FlacStreamDecoder<E> {
    /// 用自定义引擎打开字节源
    ///
    /// `build` 收到注入了输入角色的游标。元数据解析失败、缺少STREAMINFO、
    /// 声道数为0或位深越界时返回错误，字节源随之释放。
    pub fn open_with_engine<S, F>(source: S, build: F) -> AudioResult<Self>
    where
        S: ByteSource + 'static,
        F: FnOnce(SourceCursor) -> AudioResult<E>,
    {
        let cursor = SourceCursor::new(Box::new(source));
        let source_length = cursor.length();
        if source_length.is_none() {
            debug!("字节源长度未知，使用手动seek / unknown source length, manual seeking enabled");
        }

        let engine = build(cursor.clone())?;

        let mut decoder = Self {
            engine,
            cursor,
            sink: PcmSink::new(),
            source_length,
            requested_sample: 0,
            bytes_since_request: 0,
            finished: true,
            initialized: false,
        };
        decoder.restart(true)?;
        decoder.initialized = true;
        Ok(decoder)
    }

    /// 回到流起点并重新解析元数据
    ///
    /// 失败时解码器保持 `Finished`。
    fn restart(&mut self, first_time: bool) -> AudioResult<()> {
        self.finished = true;

        self.cursor.rewind();
        self.sink.buffer.clear();
        self.requested_sample = 0;
        self.bytes_since_request = 0;

        if !first_time && !self.engine.reset() {
            error!("引擎重置失败 / engine reset failed");
            return Err(error::decoding_error("引擎重置失败", "reset"));
        }

        if !self.engine.process_metadata(&mut self.sink) {
            error!("元数据处理失败 / metadata processing failed");
            return Err(error::format_error("元数据处理失败", "process_metadata"));
        }

        let info = self
            .sink
            .info
            .ok_or_else(|| error::format_error("缺少STREAMINFO", "no stream info block"))?;
        if let Err(e) = info.validate() {
            error!("流参数非法 / invalid stream parameters: {e}");
            return Err(e);
        }

        self.finished = false;
        Ok(())
    }

    /// 让引擎处理一帧
    ///
    /// 已到达字节源末尾或已终止时直接返回 `false`。引擎失败，或本次调用没有写出音频，
    /// 解码器都进入 `Finished`。返回本次是否写出了一帧。
    pub fn step(&mut self) -> bool {
        if self.cursor.is_end_of_source() || self.finished {
            return false;
        }

        self.sink.called_write = false;
        let engine_ok = self.engine.process_one_frame(&mut self.sink);
        if !engine_ok || !self.sink.called_write {
            debug!(
                "解码结束 / decoding finished (engine_ok={engine_ok}, wrote={})",
                self.sink.called_write
            );
            self.finished = true;
        }

        !self.finished
    }

    /// 从输出缓冲区取出已解码的PCM字节，返回拷贝数
    ///
    /// 不会调用 `step()`；调用方自行决定何时继续解码。
    pub fn read(&mut self, dest: &mut [u8]) -> usize {
        let n = self.sink.buffer.consume(dest);
        self.bytes_since_request += n as u64;
        n
    }

    /// 反复 `step()` 直到填满 `dest` 或解码停止，返回拷贝数
    pub fn read_full(&mut self, dest: &mut [u8]) -> usize {
        let mut filled = 0;
        loop {
            filled += self.read(&mut dest[filled..]);
            if filled == dest.len() || !self.step() {
                break;
            }
        }
        if filled < dest.len() {
            filled += self.read(&mut dest[filled..]);
        }
        filled
    }

    /// 定位到样本位置（尽力而为）
    ///
    /// 目标钳制到 `[0, total_samples]`。seek总会清除终止状态。
    /// 字节源长度已知时走引擎的原生seek，失败则保持原状态；长度未知时解码并丢弃。
    pub fn seek_to(&mut self, sample: i64) {
        self.finished = false;

        let Some(info) = self.sink.info else {
            return;
        };

        // 总样本数为0（未知）时同样钳制，目标落到0
        let target = (sample.max(0) as u64).min(info.total_samples);

        if self.source_length.is_none() {
            self.manual_seek(target, &info);
            return;
        }

        if self.engine.seek_absolute(target, &mut self.sink) {
            self.sink.buffer.clear();
            self.requested_sample = target;
            self.bytes_since_request = 0;
        } else {
            warn!("seek失败 / seek to sample {target} failed");
        }
    }

    /// 长度未知时的seek：必要时从头重启，然后解码并丢弃到目标位置
    fn manual_seek(&mut self, target: u64, info: &StreamInfo) {
        let frame_bytes = info.pcm_frame_bytes();
        let mut target_byte = target
            .saturating_sub(self.requested_sample)
            .saturating_mul(frame_bytes);

        if target < self.requested_sample || self.bytes_since_request > target_byte {
            if let Err(e) = self.restart(false) {
                warn!("手动seek重启失败 / manual seek restart failed: {e}");
                return;
            }
            target_byte = target.saturating_mul(frame_bytes);
        }

        while self.bytes_since_request < target_byte {
            let remaining = target_byte - self.bytes_since_request;
            let take = (self.sink.buffer.len() as u64).min(remaining) as usize;
            self.bytes_since_request += self.sink.buffer.discard(take) as u64;

            if self.bytes_since_request < target_byte
                && self.sink.buffer.is_empty()
                && !self.step()
            {
                debug!(
                    "手动seek在目标前结束 / manual seek stopped early at sample {}",
                    self.position()
                );
                return;
            }
        }
    }

    /// 当前PCM帧位置：请求位置 + 已读字节 / (声道数 × 2)
    pub fn position(&self) -> u64 {
        let frame_bytes = self.sink.info.map(|info| info.pcm_frame_bytes()).unwrap_or(0);
        if frame_bytes == 0 {
            return 0;
        }
        self.requested_sample + self.bytes_since_request / frame_bytes
    }

    /// 当前状态
    pub fn state(&self) -> DecoderState {
        if !self.initialized {
            DecoderState::Uninitialized
        } else if self.finished {
            DecoderState::Finished
        } else if self.cursor.is_end_of_source() {
            DecoderState::EndOfSource
        } else {
            DecoderState::Ready
        }
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// 流参数（打开成功后必然存在）
    pub fn stream_info(&self) -> StreamInfo {
        self.sink.info.unwrap_or_default()
    }

    pub fn sample_rate(&self) -> u32 {
        self.stream_info().sample_rate
    }

    pub fn channels(&self) -> u32 {
        self.stream_info().channels
    }

    /// 源位深度（归一化前）
    pub fn bits_per_sample(&self) -> u32 {
        self.stream_info().bits_per_sample
    }

    /// 总样本数，0 表示未知
    pub fn total_samples(&self) -> u64 {
        self.stream_info().total_samples
    }

    /// 已解码但尚未读取的字节数
    pub fn buffered_bytes(&self) -> usize {
        self.sink.buffer.len()
    }

    /// 构造时缓存的字节源长度
    pub fn source_length(&self) -> Option<u64> {
        self.source_length
    }

    /// 是否使用引擎的原生seek
    pub fn native_seek_supported(&self) -> bool {
        self.source_length.is_some()
    }

    /// 写入块统计
    pub fn block_stats(&self) -> &BlockStats {
        &self.sink.stats
    }

    /// 最近一次引擎报告的比特流错误
    pub fn last_fault(&self) -> Option<&StreamFault> {
        self.sink.last_fault.as_ref()
    }

    /// 引擎报告的比特流错误次数
    pub fn fault_count(&self) -> u64 {
        self.sink.fault_count
    }

    /// 调用字节源 `read_at` 的累计次数
    pub fn source_reads(&self) -> u64 {
        self.cursor.source_reads()
    }

    /// 显式拆除解码器
    ///
    /// 字节源的 `release()` 由随解码器一起drop的游标完成，与直接drop解码器等价。
    pub fn close(self) {
        debug!(
            "关闭解码器 / closing decoder at sample {}",
            self.position()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::engine::{ReadStatus, SeekStatus, SourceRoles};
    use crate::audio::source::MemorySource;
    use crate::error::AudioError;
    use crate::processing::pcm_bytes_to_i16;

    /// 每读一个字节产出一个块的脚本引擎，块内样本值等于该字节
    struct ScriptEngine {
        cursor: SourceCursor,
        info: Option<StreamInfo>,
        frames_per_block: usize,
        extra_metadata: bool,
        fault_each_frame: bool,
        /// 第几个块（从0计）按错误的声道数写出
        broken_block_at: Option<usize>,
        blocks: usize,
    }

    impl ScriptEngine {
        fn new(cursor: SourceCursor, info: Option<StreamInfo>) -> Self {
            Self {
                cursor,
                info,
                frames_per_block: 2,
                extra_metadata: false,
                fault_each_frame: false,
                broken_block_at: None,
                blocks: 0,
            }
        }
    }

    impl BitstreamEngine for ScriptEngine {
        fn process_metadata(&mut self, out: &mut dyn OutputRoles) -> bool {
            if let Some(info) = self.info {
                out.on_metadata(MetadataBlock::StreamInfo(info));
                if self.extra_metadata {
                    out.on_metadata(MetadataBlock::StreamInfo(StreamInfo::new(1, 8000, 1, 8)));
                    out.on_metadata(MetadataBlock::Other { block_type: 4 });
                }
            }
            true
        }

        fn process_one_frame(&mut self, out: &mut dyn OutputRoles) -> bool {
            let mut byte = [0u8; 1];
            match self.cursor.on_read(&mut byte) {
                ReadStatus::Continue(_) => {
                    if self.fault_each_frame {
                        out.on_error(StreamFault::FrameCrcMismatch);
                    }
                    let mut channels = self.info.map(|i| i.channels as usize).unwrap_or(1);
                    if self.broken_block_at == Some(self.blocks) {
                        channels += 1;
                    }
                    self.blocks += 1;
                    let plane = vec![i32::from(byte[0]); self.frames_per_block];
                    let planes: Vec<&[i32]> = (0..channels).map(|_| plane.as_slice()).collect();
                    out.on_write(&planes, self.frames_per_block) == WriteStatus::Continue
                }
                ReadStatus::EndOfStream => true,
                ReadStatus::Abort => false,
            }
        }

        fn seek_absolute(&mut self, sample: u64, _out: &mut dyn OutputRoles) -> bool {
            let fpb = self.frames_per_block as u64;
            if sample % fpb != 0 {
                return false;
            }
            self.cursor.on_seek(sample / fpb) == SeekStatus::Ok
        }

        fn reset(&mut self) -> bool {
            self.cursor.on_seek(0) == SeekStatus::Ok
        }
    }

    fn open_script(
        data: Vec<u8>,
        info: Option<StreamInfo>,
        configure: impl FnOnce(&mut ScriptEngine),
    ) -> AudioResult<FlacStreamDecoder<ScriptEngine>> {
        FlacStreamDecoder::open_with_engine(MemorySource::new(data), |cursor| {
            let mut engine = ScriptEngine::new(cursor, info);
            configure(&mut engine);
            Ok(engine)
        })
    }

    fn stereo16() -> Option<StreamInfo> {
        Some(StreamInfo::new(6, 44_100, 2, 16))
    }

    #[test]
    fn test_open_reads_stream_info() {
        let decoder = open_script(vec![1, 2, 3], stereo16(), |_| {}).unwrap();
        assert_eq!(decoder.sample_rate(), 44_100);
        assert_eq!(decoder.channels(), 2);
        assert_eq!(decoder.bits_per_sample(), 16);
        assert_eq!(decoder.total_samples(), 6);
        assert_eq!(decoder.position(), 0);
        assert_eq!(decoder.buffered_bytes(), 0);
        assert_eq!(decoder.state(), DecoderState::Ready);
        assert!(decoder.native_seek_supported());
    }

    #[test]
    fn test_open_rejects_invalid_stream_params() {
        let cases = [
            None,
            Some(StreamInfo::new(0, 44_100, 0, 16)),
            Some(StreamInfo::new(0, 44_100, 2, 4)),
            Some(StreamInfo::new(0, 44_100, 2, 33)),
        ];
        for info in cases {
            let result = open_script(vec![1], info, |_| {});
            assert!(
                matches!(result, Err(AudioError::FormatError(_))),
                "info={info:?}"
            );
        }
    }

    #[test]
    fn test_step_then_read_is_fifo() {
        let mut decoder = open_script(vec![1, 2, 3], stereo16(), |_| {}).unwrap();

        assert!(decoder.step());
        assert_eq!(decoder.buffered_bytes(), 8);
        assert!(decoder.step());
        assert_eq!(decoder.buffered_bytes(), 16);

        let mut head = [0u8; 3];
        assert_eq!(decoder.read(&mut head), 3);
        let mut rest = [0u8; 13];
        assert_eq!(decoder.read(&mut rest), 13);

        let mut all = head.to_vec();
        all.extend_from_slice(&rest);
        assert_eq!(pcm_bytes_to_i16(&all), vec![1, 1, 1, 1, 2, 2, 2, 2]);
        assert_eq!(decoder.position(), 4);
        assert_eq!(decoder.read(&mut rest), 0);
    }

    #[test]
    fn test_end_of_source_then_finished() {
        let mut decoder = open_script(vec![5, 6, 7], stereo16(), |_| {}).unwrap();
        assert!(decoder.step());
        assert!(decoder.step());
        assert!(decoder.step());

        // 第四次读到EOF，没有写出 → 终止
        assert!(!decoder.step());
        assert_eq!(decoder.state(), DecoderState::Finished);

        let reads = decoder.source_reads();
        assert!(!decoder.step());
        assert_eq!(decoder.source_reads(), reads);

        // 缓冲区里的数据仍可读出
        assert_eq!(decoder.buffered_bytes(), 24);
    }

    #[test]
    fn test_read_full_drains_everything() {
        let mut decoder = open_script(vec![1, 2, 3], stereo16(), |_| {}).unwrap();
        let mut dest = vec![0u8; 100];
        assert_eq!(decoder.read_full(&mut dest), 24);
        assert_eq!(decoder.position(), 6);
        assert!(decoder.is_finished());
        assert_eq!(decoder.read_full(&mut dest), 0);
    }

    #[test]
    fn test_repeated_stream_info_ignored() {
        let decoder = open_script(vec![1], stereo16(), |e| e.extra_metadata = true).unwrap();
        assert_eq!(decoder.stream_info(), StreamInfo::new(6, 44_100, 2, 16));
    }

    #[test]
    fn test_engine_faults_are_advisory() {
        let mut decoder =
            open_script(vec![1, 2], stereo16(), |e| e.fault_each_frame = true).unwrap();
        assert!(decoder.step());
        assert!(decoder.step());
        assert_eq!(decoder.fault_count(), 2);
        assert_eq!(decoder.last_fault(), Some(&StreamFault::FrameCrcMismatch));
        assert_eq!(decoder.block_stats().total_blocks, 2);
    }

    #[test]
    fn test_native_seek_failure_keeps_state() {
        let mut decoder = open_script(vec![1, 2, 3], stereo16(), |_| {}).unwrap();
        assert!(decoder.step());
        let mut one_frame = [0u8; 4];
        decoder.read(&mut one_frame);
        assert_eq!(decoder.position(), 1);

        decoder.seek_to(3);
        assert_eq!(decoder.position(), 1);
        assert_eq!(decoder.buffered_bytes(), 4);
    }

    #[test]
    fn test_native_seek_success_resets_counters() {
        let mut decoder = open_script(vec![1, 2, 3], stereo16(), |_| {}).unwrap();
        assert!(decoder.step());

        decoder.seek_to(4);
        assert_eq!(decoder.position(), 4);
        assert_eq!(decoder.buffered_bytes(), 0);

        assert!(decoder.step());
        let mut frame = [0u8; 4];
        decoder.read(&mut frame);
        assert_eq!(pcm_bytes_to_i16(&frame), vec![3, 3]);
        assert_eq!(decoder.position(), 5);
    }

    #[test]
    fn test_seek_clamps_and_clears_finished() {
        let mut decoder = open_script(vec![1, 2, 3], stereo16(), |_| {}).unwrap();
        let mut sink = vec![0u8; 64];
        decoder.read_full(&mut sink);
        assert_eq!(decoder.state(), DecoderState::Finished);

        decoder.seek_to(-10);
        assert_eq!(decoder.position(), 0);
        assert_eq!(decoder.state(), DecoderState::Ready);
        assert!(decoder.step());

        decoder.seek_to(1_000);
        assert_eq!(decoder.position(), 6);
    }

    #[test]
    fn test_write_abort_keeps_buffered_audio() {
        let mut decoder =
            open_script(vec![1, 2, 3], stereo16(), |e| e.broken_block_at = Some(1)).unwrap();
        assert!(decoder.step());
        assert_eq!(decoder.buffered_bytes(), 8);

        // 块形状不符 → 写角色中止，引擎失败
        assert!(!decoder.step());
        assert_eq!(decoder.state(), DecoderState::Finished);
        assert_eq!(decoder.buffered_bytes(), 8);
        assert_eq!(decoder.block_stats().total_blocks, 1);

        let reads = decoder.source_reads();
        assert!(!decoder.step());
        assert_eq!(decoder.source_reads(), reads);

        let mut out = [0u8; 16];
        assert_eq!(decoder.read(&mut out), 8);
        assert_eq!(pcm_bytes_to_i16(&out[..8]), vec![1, 1, 1, 1]);
        assert_eq!(decoder.position(), 2);
    }

    #[test]
    fn test_low_bit_depth_is_scaled_up() {
        let info = Some(StreamInfo::new(0, 8_000, 1, 8));
        let mut decoder = open_script(vec![1], info, |_| {}).unwrap();
        assert!(decoder.step());
        let mut out = [0u8; 4];
        assert_eq!(decoder.read(&mut out), 4);
        assert_eq!(pcm_bytes_to_i16(&out), vec![256, 256]);
    }
}
