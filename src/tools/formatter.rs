//! 输出格式化模块
//!
//! 流参数表格/JSON与解码摘要的展示。

use super::processor::DecodeSummary;
use crate::audio::StreamInfo;
use crate::error::{AudioError, AudioResult};
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::UTF8_FULL};
use serde::Serialize;

/// `--info --json` 的输出结构
#[derive(Debug, Serialize)]
struct InfoReport<'a> {
    #[serde(flatten)]
    info: &'a StreamInfo,
    source_length: Option<u64>,
    duration_seconds: f64,
    pcm_bytes: Option<u64>,
}

fn right(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

/// 流参数表格
pub fn format_info_table(info: &StreamInfo, source_length: Option<u64>) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Field / 字段", "Value / 值"]);

    let unknown = || "unknown / 未知".to_string();

    table.add_row(vec![
        Cell::new("Sample Rate / 采样率"),
        right(format!("{} Hz", info.sample_rate)),
    ]);
    table.add_row(vec![
        Cell::new("Channels / 声道数"),
        right(info.channels.to_string()),
    ]);
    table.add_row(vec![
        Cell::new("Source Bits / 源位深"),
        right(info.bits_per_sample.to_string()),
    ]);
    table.add_row(vec![
        Cell::new("Total Samples / 总样本数"),
        right(if info.has_known_length() {
            info.total_samples.to_string()
        } else {
            unknown()
        }),
    ]);
    table.add_row(vec![
        Cell::new("Duration / 时长"),
        right(if info.has_known_length() {
            format!("{:.3} s", info.duration_seconds())
        } else {
            unknown()
        }),
    ]);
    table.add_row(vec![
        Cell::new("Source Bytes / 字节源长度"),
        right(source_length.map(|len| len.to_string()).unwrap_or_else(unknown)),
    ]);
    table.add_row(vec![
        Cell::new("Seek Mode / 定位方式"),
        right(if source_length.is_some() {
            "native".to_string()
        } else {
            "manual".to_string()
        }),
    ]);

    table.to_string()
}

/// 流参数JSON
pub fn format_info_json(info: &StreamInfo, source_length: Option<u64>) -> AudioResult<String> {
    let report = InfoReport {
        info,
        source_length,
        duration_seconds: info.duration_seconds(),
        pcm_bytes: info.pcm_len_bytes(),
    };
    serde_json::to_string_pretty(&report)
        .map_err(|e| AudioError::ResourceError(format!("JSON序列化失败: {e}")))
}

/// 解码摘要（verbose模式写到标准错误）
pub fn format_summary(summary: &DecodeSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "[INFO] 样本范围 / Samples: {} -> {}\n",
        summary.start_sample, summary.end_sample
    ));
    out.push_str(&format!(
        "[INFO] 输出字节 / Bytes written: {}\n",
        summary.bytes_written
    ));
    out.push_str(&format!(
        "[INFO] 块统计 / Blocks: {} (min {}, max {}, mean {:.1})\n",
        summary.blocks.total_blocks,
        summary.blocks.min_size_or_zero(),
        summary.blocks.max_size,
        summary.blocks.mean_size()
    ));
    if summary.fault_count > 0 {
        out.push_str(&format!(
            "[WARNING] 比特流错误 / Bitstream faults: {}\n",
            summary.fault_count
        ));
    }
    out
}
