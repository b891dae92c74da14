//! 工具模块集合
//!
//! 包含CLI、解码任务处理、格式化等工具模块，支持main.rs的流程控制。

pub mod cli;
pub mod constants;
pub mod formatter;
pub mod processor;
pub mod utils;

// 重新导出主要的公共接口
pub use cli::{
    AppConfig, InputSource, OutputFormat, parse_args, parse_args_from, show_completion_info,
    show_startup_info,
};
pub use formatter::{format_info_json, format_info_table, format_summary};
pub use processor::{
    DecodeSummary, decode_to_wav, decode_to_writer, open_decoder, process_decoder, process_stream,
};
pub use utils::path;
