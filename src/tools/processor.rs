//! 音频处理模块
//!
//! 负责打开解码器、执行seek、把PCM拉取到输出目标（裸PCM或WAV）。

use super::cli::{AppConfig, InputSource, OutputFormat};
use super::constants::wav;
use crate::audio::{
    BitstreamEngine, BlockStats, DecoderState, FileSource, FlacStreamDecoder, ReaderSource,
    StreamInfo, SymphoniaFlacEngine,
};
use crate::error::{AudioError, AudioResult};
use crate::processing::pcm_bytes_to_i16;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Seek, Write};
use tracing::debug;

/// 一次解码任务的结果摘要
#[derive(Debug, Clone, Serialize)]
pub struct DecodeSummary {
    pub info: StreamInfo,
    /// 字节源长度（未知时为 None）
    pub source_length: Option<u64>,
    /// 开始输出时的样本位置
    pub start_sample: u64,
    /// 结束时的样本位置
    pub end_sample: u64,
    pub bytes_written: u64,
    pub blocks: BlockStats,
    pub fault_count: u64,
    /// 解码结束时的状态
    #[serde(skip)]
    pub final_state: DecoderState,
}

/// 按配置打开解码器
pub fn open_decoder(config: &AppConfig) -> AudioResult<FlacStreamDecoder<SymphoniaFlacEngine>> {
    match &config.input {
        InputSource::Stdin => {
            debug!("从标准输入读取 / reading from stdin");
            FlacStreamDecoder::open(ReaderSource::new(io::stdin()))
        }
        InputSource::File(path) if config.hide_length => {
            FlacStreamDecoder::open(FileSource::open_unsized(path)?)
        }
        InputSource::File(path) => FlacStreamDecoder::open(FileSource::open(path)?),
    }
}

/// 把解码器剩余的PCM全部写到 `writer`，返回写出的字节数
pub fn decode_to_writer<E, W>(
    decoder: &mut FlacStreamDecoder<E>,
    writer: &mut W,
    chunk_size: usize,
) -> AudioResult<u64>
where
    E: BitstreamEngine,
    W: Write,
{
    let mut chunk = vec![0u8; chunk_size];
    let mut total = 0u64;
    loop {
        let n = decoder.read_full(&mut chunk);
        if n == 0 {
            break;
        }
        writer.write_all(&chunk[..n])?;
        total += n as u64;
    }
    writer.flush()?;
    Ok(total)
}

/// 把解码器剩余的PCM写成WAV，返回写出的PCM字节数
pub fn decode_to_wav<E, W>(
    decoder: &mut FlacStreamDecoder<E>,
    writer: W,
    chunk_size: usize,
) -> AudioResult<u64>
where
    E: BitstreamEngine,
    W: Write + Seek,
{
    let channels = u16::try_from(decoder.channels()).map_err(|_| {
        AudioError::InvalidInput(format!("WAV不支持 {} 个声道", decoder.channels()))
    })?;
    let spec = hound::WavSpec {
        channels,
        sample_rate: decoder.sample_rate(),
        bits_per_sample: wav::BITS_PER_SAMPLE,
        sample_format: wav::SAMPLE_FORMAT,
    };

    let mut wav_writer = hound::WavWriter::new(writer, spec)?;
    let mut chunk = vec![0u8; chunk_size];
    let mut total = 0u64;
    loop {
        let n = decoder.read_full(&mut chunk);
        if n == 0 {
            break;
        }
        for sample in pcm_bytes_to_i16(&chunk[..n]) {
            wav_writer.write_sample(sample)?;
        }
        total += n as u64;
    }
    wav_writer.finalize()?;
    Ok(total)
}

/// 执行一次完整的解码任务
pub fn process_stream(config: &AppConfig) -> AudioResult<DecodeSummary> {
    config.validate()?;
    let mut decoder = open_decoder(config)?;
    process_decoder(&mut decoder, config)
}

/// 对已打开的解码器执行seek与输出（供测试注入自定义引擎）
pub fn process_decoder<E: BitstreamEngine>(
    decoder: &mut FlacStreamDecoder<E>,
    config: &AppConfig,
) -> AudioResult<DecodeSummary> {
    if let Some(sample) = config.seek_sample {
        decoder.seek_to(sample);
        if config.verbose {
            eprintln!(
                "[INFO] 定位到样本 / Seeked to sample: {} ({})",
                decoder.position(),
                if decoder.native_seek_supported() {
                    "native"
                } else {
                    "manual"
                }
            );
        }
    }
    let start_sample = decoder.position();

    let bytes_written = if config.info_only {
        0
    } else {
        match (config.output_format, &config.output_path) {
            (OutputFormat::Wav, Some(path)) => {
                decode_to_wav(decoder, BufWriter::new(File::create(path)?), config.chunk_size)?
            }
            (OutputFormat::RawPcm, Some(path)) => {
                let mut writer = BufWriter::new(File::create(path)?);
                decode_to_writer(decoder, &mut writer, config.chunk_size)?
            }
            (OutputFormat::RawPcm, None) => {
                let stdout = io::stdout();
                let mut writer = stdout.lock();
                decode_to_writer(decoder, &mut writer, config.chunk_size)?
            }
            (OutputFormat::Wav, None) => {
                return Err(AudioError::InvalidInput(
                    "--wav 需要 --output 指定文件 / --wav requires --output FILE".to_string(),
                ));
            }
        }
    };

    Ok(DecodeSummary {
        info: decoder.stream_info(),
        source_length: decoder.source_length(),
        start_sample,
        end_sample: decoder.position(),
        bytes_written,
        blocks: decoder.block_stats().clone(),
        fault_count: decoder.fault_count(),
        final_state: decoder.state(),
    })
}
