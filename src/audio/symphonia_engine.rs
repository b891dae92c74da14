//! 基于 symphonia 的FLAC比特流引擎
//!
//! 把 symphonia 的 FLAC 解复用器与解码器包装成 [`BitstreamEngine`]。
//! 字节访问全部经过注入的 [`SourceCursor`]，输出经由调用方传入的 [`OutputRoles`]。

use super::cursor::SourceCursor;
use super::engine::{
    BitstreamEngine, LengthStatus, MetadataBlock, OutputRoles, ReadStatus, SeekStatus,
    SourceRoles, StreamFault, WriteStatus,
};
use super::format::StreamInfo;
use crate::error::{self, AudioResult};
use std::io::{self, Read, Seek, SeekFrom};
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::sample::Sample;
use symphonia::default::formats::FlacReader;
use tracing::{debug, error, warn};

/// 引擎选项
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineOptions {
    /// 校验流的MD5签名（默认关闭）
    pub verify_checksums: bool,
}

/// 把游标暴露为 symphonia 的 `MediaSource`
///
/// 只有字节源长度已知时才声明可seek，未知长度的流从不走原生seek。
struct CursorMediaSource {
    cursor: SourceCursor,
}

impl Read for CursorMediaSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.cursor.on_read(buf) {
            ReadStatus::Continue(n) => Ok(n),
            ReadStatus::EndOfStream => Ok(0),
            ReadStatus::Abort => Err(io::Error::other("byte source aborted")),
        }
    }
}

impl Seek for CursorMediaSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.cursor.on_tell().checked_add_signed(delta),
            SeekFrom::End(delta) => match self.cursor.on_length() {
                LengthStatus::Known(len) => len.checked_add_signed(delta),
                LengthStatus::Unsupported => {
                    return Err(io::Error::new(
                        io::ErrorKind::Unsupported,
                        "byte source length unknown",
                    ));
                }
            },
        };

        let target = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of source")
        })?;

        match self.cursor.on_seek(target) {
            SeekStatus::Ok => Ok(target),
            SeekStatus::Error => Err(io::Error::other("byte source seek failed")),
        }
    }
}

impl MediaSource for CursorMediaSource {
    fn is_seekable(&self) -> bool {
        self.cursor.length().is_some()
    }

    fn byte_len(&self) -> Option<u64> {
        self.cursor.length()
    }
}

/// 已解析元数据的活动流
struct ActiveStream {
    reader: FlacReader,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    bits_per_sample: u32,
}

/// symphonia FLAC 引擎
pub struct SymphoniaFlacEngine {
    cursor: SourceCursor,
    options: EngineOptions,
    stream: Option<ActiveStream>,
    /// 每声道的源位深样本，跨帧复用
    planes: Vec<Vec<i32>>,
    /// seek 后下一个包需要丢弃的帧数
    pending_trim: u64,
}

impl SymphoniaFlacEngine {
    pub fn new(cursor: SourceCursor, options: EngineOptions) -> Self {
        Self {
            cursor,
            options,
            stream: None,
            planes: Vec::new(),
            pending_trim: 0,
        }
    }

    fn open_stream(&self) -> AudioResult<(ActiveStream, StreamInfo)> {
        let media = CursorMediaSource {
            cursor: self.cursor.clone(),
        };
        let mss = MediaSourceStream::new(Box::new(media), Default::default());
        let reader = FlacReader::try_new(mss, &FormatOptions::default())?;

        let track = reader
            .default_track()
            .ok_or_else(|| error::format_error("FLAC流中没有音轨", "default track"))?;
        let params = &track.codec_params;
        let info = StreamInfo::new(
            params.n_frames.unwrap_or(0),
            params.sample_rate.unwrap_or(0),
            params.channels.map(|c| c.count() as u32).unwrap_or(0),
            params.bits_per_sample.unwrap_or(0),
        );
        let track_id = track.id;

        let decoder = symphonia::default::get_codecs().make(
            params,
            &DecoderOptions {
                verify: self.options.verify_checksums,
            },
        )?;

        Ok((
            ActiveStream {
                reader,
                decoder,
                track_id,
                bits_per_sample: info.bits_per_sample,
            },
            info,
        ))
    }
}

impl BitstreamEngine for SymphoniaFlacEngine {
    fn process_metadata(&mut self, out: &mut dyn OutputRoles) -> bool {
        match self.open_stream() {
            Ok((stream, info)) => {
                out.on_metadata(MetadataBlock::StreamInfo(info));
                self.stream = Some(stream);
                true
            }
            Err(e) => {
                error!("无法解析FLAC元数据 / cannot parse FLAC metadata: {e}");
                out.on_error(StreamFault::UnparseableStream);
                false
            }
        }
    }

    fn process_one_frame(&mut self, out: &mut dyn OutputRoles) -> bool {
        let Some(stream) = self.stream.as_mut() else {
            return false;
        };

        loop {
            let packet = match stream.reader.next_packet() {
                Ok(packet) if packet.track_id() == stream.track_id => packet,
                Ok(_) => continue,
                Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    debug!("FLAC流结束 / end of FLAC stream");
                    return true;
                }
                Err(SymphoniaError::DecodeError(msg)) => {
                    out.on_error(fault_from_message(msg));
                    return true;
                }
                Err(e) => {
                    error!("读取FLAC帧失败 / failed to read FLAC frame: {e}");
                    return false;
                }
            };

            let decoded = match stream.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(msg)) => {
                    out.on_error(fault_from_message(msg));
                    return true;
                }
                Err(e) => {
                    error!("FLAC帧解码失败 / FLAC frame decode failed: {e}");
                    return false;
                }
            };

            let frames = match copy_planes(&decoded, stream.bits_per_sample, &mut self.planes) {
                Ok(frames) => frames,
                Err(e) => {
                    out.on_error(StreamFault::Corrupt(e.to_string()));
                    return false;
                }
            };

            let skip = self.pending_trim.min(frames as u64) as usize;
            self.pending_trim -= skip as u64;
            if skip == frames {
                // 整帧都在 seek 目标之前
                continue;
            }

            let planes: Vec<&[i32]> = self.planes.iter().map(|plane| &plane[skip..]).collect();
            return out.on_write(&planes, frames - skip) == WriteStatus::Continue;
        }
    }

    fn seek_absolute(&mut self, sample: u64, _out: &mut dyn OutputRoles) -> bool {
        let Some(stream) = self.stream.as_mut() else {
            return false;
        };

        let seek_to = SeekTo::TimeStamp {
            ts: sample,
            track_id: stream.track_id,
        };
        match stream.reader.seek(SeekMode::Accurate, seek_to) {
            Ok(seeked) => {
                stream.decoder.reset();
                self.pending_trim = seeked.required_ts.saturating_sub(seeked.actual_ts);
                debug!(
                    "seek到样本 {} (帧起点 {}) / seeked to sample {} (frame start {})",
                    seeked.required_ts, seeked.actual_ts, seeked.required_ts, seeked.actual_ts
                );
                true
            }
            Err(e) => {
                warn!("FLAC seek失败 / FLAC seek failed: {e}");
                false
            }
        }
    }

    fn reset(&mut self) -> bool {
        self.stream = None;
        self.pending_trim = 0;
        self.cursor.on_seek(0) == SeekStatus::Ok
    }
}

fn fault_from_message(msg: &str) -> StreamFault {
    let lower = msg.to_ascii_lowercase();
    if lower.contains("crc") {
        StreamFault::FrameCrcMismatch
    } else if lower.contains("sync") {
        StreamFault::LostSync
    } else if lower.contains("header") {
        StreamFault::BadHeader
    } else {
        StreamFault::Corrupt(msg.to_string())
    }
}

/// 把解码缓冲区转换为源位深的 `i32` 平面，返回每声道帧数
///
/// symphonia 的整数样本占满各自类型的位宽（FLAC 的 S32 输出左对齐），
/// 先扩展到满 32 位再算术右移回源位深。
fn copy_planes(
    decoded: &AudioBufferRef<'_>,
    bits_per_sample: u32,
    planes: &mut Vec<Vec<i32>>,
) -> AudioResult<usize> {
    let shift = 32 - bits_per_sample.clamp(1, 32);
    match decoded {
        AudioBufferRef::S32(buf) => fill_planes(&**buf, planes, |s| s >> shift),
        AudioBufferRef::S24(buf) => fill_planes(&**buf, planes, |s| (s.inner() << 8) >> shift),
        AudioBufferRef::S16(buf) => fill_planes(&**buf, planes, |s| (i32::from(s) << 16) >> shift),
        AudioBufferRef::S8(buf) => fill_planes(&**buf, planes, |s| (i32::from(s) << 24) >> shift),
        _ => Err(error::decoding_error(
            "不支持的样本格式",
            "engine produced unsigned or float samples",
        )),
    }
}

fn fill_planes<S: Sample>(
    buf: &AudioBuffer<S>,
    planes: &mut Vec<Vec<i32>>,
    convert: impl Fn(S) -> i32,
) -> AudioResult<usize> {
    let channels = buf.spec().channels.count();
    planes.resize_with(channels, Vec::new);
    for (ch, plane) in planes.iter_mut().enumerate() {
        plane.clear();
        plane.extend(buf.chan(ch).iter().map(|&s| convert(s)));
    }
    Ok(buf.frames())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::source::MemorySource;

    #[test]
    fn test_fault_classification() {
        assert_eq!(
            fault_from_message("flac: frame crc mismatch"),
            StreamFault::FrameCrcMismatch
        );
        assert_eq!(fault_from_message("lost sync"), StreamFault::LostSync);
        assert_eq!(
            fault_from_message("invalid frame header"),
            StreamFault::BadHeader
        );
        assert_eq!(
            fault_from_message("residual overflow"),
            StreamFault::Corrupt("residual overflow".to_string())
        );
    }

    #[test]
    fn test_media_source_reflects_length() {
        let sized = CursorMediaSource {
            cursor: SourceCursor::new(Box::new(MemorySource::new(vec![0u8; 10]))),
        };
        assert!(sized.is_seekable());
        assert_eq!(sized.byte_len(), Some(10));

        let unsized_source = CursorMediaSource {
            cursor: SourceCursor::new(Box::new(MemorySource::unsized_stream(vec![0u8; 10]))),
        };
        assert!(!unsized_source.is_seekable());
        assert_eq!(unsized_source.byte_len(), None);
    }

    #[test]
    fn test_media_source_seek_modes() {
        let mut media = CursorMediaSource {
            cursor: SourceCursor::new(Box::new(MemorySource::new((0u8..10).collect::<Vec<_>>()))),
        };
        assert_eq!(media.seek(SeekFrom::Start(4)).unwrap(), 4);
        assert_eq!(media.seek(SeekFrom::Current(-2)).unwrap(), 2);
        assert_eq!(media.seek(SeekFrom::End(-1)).unwrap(), 9);
        assert!(media.seek(SeekFrom::Current(-20)).is_err());

        let mut byte = [0u8; 1];
        assert_eq!(media.read(&mut byte).unwrap(), 1);
        assert_eq!(byte[0], 9);
        assert_eq!(media.read(&mut byte).unwrap(), 0);
    }

    #[test]
    fn test_garbage_fails_metadata() {
        struct NullSink;
        impl OutputRoles for NullSink {
            fn on_metadata(&mut self, _block: MetadataBlock) {}
            fn on_write(&mut self, _planes: &[&[i32]], _frames: usize) -> WriteStatus {
                WriteStatus::Continue
            }
            fn on_error(&mut self, _fault: StreamFault) {}
        }

        let cursor = SourceCursor::new(Box::new(MemorySource::new(b"RIFF----WAVE".to_vec())));
        let mut engine = SymphoniaFlacEngine::new(cursor, EngineOptions::default());
        assert!(!engine.process_metadata(&mut NullSink));
        assert!(!engine.process_one_frame(&mut NullSink));
        assert!(engine.reset());
    }
}
