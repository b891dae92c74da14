//! 手动seek测试
//!
//! 长度未知的字节源上，seek 通过解码并丢弃实现，结果必须与原生seek逐字节一致


use audio_test_fixtures::{
    ProbeCounters, ProbeSource, RawBlockEngine, expected_pcm, log, raw_stream, test_planes,
};
use flac_pcm_stream::audio::DecoderState;
use flac_pcm_stream::processing::pcm_bytes_to_i16;
use flac_pcm_stream::{FlacStreamDecoder, ReaderSource};
use std::io::Cursor;

fn open(
    data: Vec<u8>,
    block_frames: usize,
    hide_length: bool,
) -> (FlacStreamDecoder<RawBlockEngine>, ProbeCounters) {
    let (source, counters) = ProbeSource::new(data);
    let source = if hide_length {
        source.hide_length()
    } else {
        source
    };
    let decoder = FlacStreamDecoder::open_with_engine(source, |cursor| {
        Ok(RawBlockEngine::new(cursor, block_frames))
    })
    .unwrap();
    (decoder, counters)
}

/// 读出剩余全部PCM字节
fn drain_bytes<E: flac_pcm_stream::audio::BitstreamEngine>(
    decoder: &mut FlacStreamDecoder<E>,
) -> Vec<u8> {
    let mut out = Vec::new();
    let mut chunk = vec![0u8; 1000];
    loop {
        let n = decoder.read_full(&mut chunk);
        if n == 0 {
            break;
        }
        out.extend_from_slice(&chunk[..n]);
    }
    out
}

#[test]
fn test_manual_seek_matches_native_seek() {
    let planes = test_planes(2, 1000, 16);
    let data = raw_stream(44_100, 16, 1000, &planes);

    for target in [0i64, 1, 255, 256, 257, 500, 999, 1000] {
        log(
            format!("手动/原生seek比较，目标 {target}"),
            format!("manual vs native seek, target {target}"),
        );
        let (mut native, _) = open(data.clone(), 256, false);
        let (mut manual, _) = open(data.clone(), 256, true);
        assert!(native.native_seek_supported());
        assert!(!manual.native_seek_supported());

        native.seek_to(target);
        manual.seek_to(target);
        assert_eq!(manual.position(), native.position(), "target={target}");
        assert_eq!(drain_bytes(&mut manual), drain_bytes(&mut native));
    }
}

#[test]
fn test_forward_manual_seek_discards_without_restart() {
    let planes = test_planes(1, 600, 16);
    let expected = expected_pcm(&planes, 16);
    let (mut decoder, counters) = open(raw_stream(44_100, 16, 600, &planes), 100, true);

    decoder.seek_to(150);
    assert_eq!(decoder.position(), 150);
    let reads_after_first = counters.reads();

    decoder.seek_to(420);
    assert_eq!(decoder.position(), 420);
    // 向前seek只继续读取，不会回到起点重读头部之前的数据
    assert!(counters.reads() > reads_after_first);

    let tail = pcm_bytes_to_i16(&drain_bytes(&mut decoder));
    assert_eq!(&tail[..], &expected[420..]);
}

#[test]
fn test_backward_manual_seek_restarts_stream() {
    log("向后手动seek需要重启", "backward manual seek restarts the stream");
    let planes = test_planes(2, 400, 24);
    let expected = expected_pcm(&planes, 24);
    let (mut decoder, _) = open(raw_stream(48_000, 24, 400, &planes), 64, true);

    decoder.seek_to(300);
    assert_eq!(decoder.position(), 300);

    decoder.seek_to(10);
    assert_eq!(decoder.position(), 10);
    assert_eq!(decoder.stream_info().bits_per_sample, 24);

    let tail = pcm_bytes_to_i16(&drain_bytes(&mut decoder));
    assert_eq!(&tail[..], &expected[20..]);
}

#[test]
fn test_manual_seek_past_end_clamps_to_total() {
    let planes = test_planes(2, 100, 16);
    let (mut decoder, _) = open(raw_stream(44_100, 16, 100, &planes), 32, true);

    decoder.seek_to(5_000);
    assert_eq!(decoder.position(), 100);
    assert!(!decoder.step());
    assert!(drain_bytes(&mut decoder).is_empty());
}

#[test]
fn test_manual_seek_with_unknown_total_returns_to_start() {
    let planes = test_planes(2, 100, 16);
    let expected = expected_pcm(&planes, 16);
    // 总样本数未知时上界为0，任何seek都回到起点
    let (mut decoder, _) = open(raw_stream(44_100, 16, 0, &planes), 32, true);

    decoder.seek_to(60);
    assert_eq!(decoder.position(), 0);

    let mut head = [0u8; 40];
    assert_eq!(decoder.read_full(&mut head), 40);
    decoder.seek_to(5_000);
    assert_eq!(decoder.position(), 0);
    assert_eq!(pcm_bytes_to_i16(&drain_bytes(&mut decoder)), expected);
}

#[test]
fn test_manual_seek_after_finished() {
    let planes = test_planes(1, 80, 16);
    let expected = expected_pcm(&planes, 16);
    let (mut decoder, _) = open(raw_stream(44_100, 16, 80, &planes), 16, true);

    drain_bytes(&mut decoder);
    assert_eq!(decoder.state(), DecoderState::Finished);

    decoder.seek_to(40);
    assert_eq!(decoder.position(), 40);
    let tail = pcm_bytes_to_i16(&drain_bytes(&mut decoder));
    assert_eq!(&tail[..], &expected[40..]);
}

#[test]
fn test_backward_seek_on_forward_only_source_terminates() {
    let planes = test_planes(1, 200, 16);
    let data = raw_stream(44_100, 16, 200, &planes);
    let mut decoder = FlacStreamDecoder::open_with_engine(
        ReaderSource::new(Cursor::new(data)),
        |cursor| Ok(RawBlockEngine::new(cursor, 50)),
    )
    .unwrap();

    decoder.seek_to(120);
    assert_eq!(decoder.position(), 120);

    // 只进流无法回到起点：重启失败后解码器终止，而不是输出错误的音频
    decoder.seek_to(10);
    assert_eq!(decoder.state(), DecoderState::Finished);
    assert!(!decoder.step());
}
