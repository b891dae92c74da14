//! flac-pcm-stream - 主程序入口
//!
//! 纯流程控制器：解析参数、打开解码器、把PCM拉取到输出目标。

use flac_pcm_stream::{
    error::{AudioError, ErrorCategory},
    tools::{self, AppConfig, InputSource},
};
use std::process;
use tracing_subscriber::EnvFilter;

/// 错误退出码定义
mod exit_codes {
    /// 通用错误
    pub const GENERAL_ERROR: i32 = 1;
    /// 格式/输入错误
    pub const FORMAT_ERROR: i32 = 2;
    /// 解码失败
    pub const DECODING_ERROR: i32 = 3;
    /// 内存错误
    pub const MEMORY_ERROR: i32 = 4;
    /// 资源错误
    pub const RESOURCE_ERROR: i32 = 5;
}

/// 获取错误建议文本
fn get_error_suggestion(error: &AudioError) -> &'static str {
    match error {
        AudioError::InvalidInput(_) => {
            "检查命令行参数是否正确，使用 --help 查看完整用法 / Check if command-line arguments are correct, use --help to see full usage"
        }
        AudioError::ResourceError(_) => {
            "检查输出路径是否可写 / Check that the output path is writable"
        }
        AudioError::OutOfMemory => {
            "内存不足，尝试减小 --chunk-size / Out of memory, try a smaller --chunk-size"
        }
        _ => match ErrorCategory::from_audio_error(error) {
            ErrorCategory::Io => {
                "检查文件路径是否正确，文件是否存在且可读 / Check if file path is correct, file exists and is readable"
            }
            ErrorCategory::Format => {
                "确保输入为FLAC流（以 fLaC 标记开头） / Ensure the input is a FLAC stream (starts with the fLaC marker)"
            }
            ErrorCategory::Decoding => {
                "文件可能损坏 / File may be corrupted"
            }
            ErrorCategory::Memory | ErrorCategory::Other => {
                "请检查输入文件和参数设置 / Please check input file and parameter settings"
            }
        },
    }
}

/// 错误处理和建议
fn handle_error(error: AudioError) -> ! {
    eprintln!("[ERROR] 错误 / Error: {error}");

    let category = ErrorCategory::from_audio_error(&error);
    eprintln!("[INFO] 类别 / Category: {}", category.display_name());
    eprintln!("[INFO] 建议 / Suggestion: {}", get_error_suggestion(&error));
    if let Some(source) = std::error::Error::source(&error) {
        eprintln!("   原因 / Cause: {source}");
    }

    let exit_code = match &error {
        AudioError::InvalidInput(_) => exit_codes::FORMAT_ERROR,
        AudioError::ResourceError(_) => exit_codes::RESOURCE_ERROR,
        _ => match category {
            ErrorCategory::Format => exit_codes::FORMAT_ERROR,
            ErrorCategory::Decoding => exit_codes::DECODING_ERROR,
            ErrorCategory::Memory => exit_codes::MEMORY_ERROR,
            ErrorCategory::Io | ErrorCategory::Other => exit_codes::GENERAL_ERROR,
        },
    };

    process::exit(exit_code);
}

/// 初始化诊断日志（RUST_LOG 优先，--verbose 时默认 debug）
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// 只显示流参数
fn show_stream_info(config: &AppConfig) -> Result<(), AudioError> {
    let decoder = tools::open_decoder(config)?;
    let info = decoder.stream_info();
    if config.json {
        println!("{}", tools::format_info_json(&info, decoder.source_length())?);
    } else {
        println!("{}", tools::format_info_table(&info, decoder.source_length()));
    }
    decoder.close();
    Ok(())
}

fn run(config: &AppConfig) -> Result<(), AudioError> {
    config.validate()?;

    if let InputSource::File(path) = &config.input {
        if config.verbose {
            eprintln!(
                "[PROCESSING] 处理 / Processing: {}",
                tools::path::extract_filename_lossy(path)
            );
        }
        if !tools::path::looks_like_flac(path) {
            eprintln!(
                "[WARNING] 扩展名不是FLAC / Extension is not FLAC: {}",
                tools::path::extract_extension_uppercase(path)
            );
        }
        // 打不开的文件留给解码器报告IO错误
        if let Ok(false) = tools::path::has_flac_marker(path) {
            eprintln!("[WARNING] 文件开头缺少fLaC标记 / Missing fLaC stream marker");
        }
    }

    if config.info_only {
        return show_stream_info(config);
    }

    let summary = tools::process_stream(config)?;
    if config.verbose {
        eprint!("{}", tools::format_summary(&summary));
    }
    Ok(())
}

fn main() {
    let config = tools::parse_args();
    init_tracing(config.verbose);
    tools::show_startup_info(&config);

    if let Err(error) = run(&config) {
        handle_error(error);
    }

    tools::show_completion_info(&config);
}
