//! 命令行接口模块
//!
//! 负责命令行参数解析、配置管理和程序信息展示。
//! 标准输出可能承载PCM数据，所有提示信息都写到标准错误。

use super::constants::defaults;
use crate::error::{AudioError, AudioResult};
use clap::{Arg, ArgMatches, Command};
use std::ffi::OsString;
use std::path::PathBuf;

/// 应用程序版本信息
const VERSION: &str = env!("CARGO_PKG_VERSION");
const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// 输入来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// 标准输入（长度未知，只能手动seek）
    Stdin,
    /// 文件路径
    File(PathBuf),
}

/// 输出容器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// 裸PCM（16位有符号交错，本机字节序）
    RawPcm,
    /// WAV容器
    Wav,
}

/// 应用程序配置
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub input: InputSource,

    /// 输出文件路径（未指定时裸PCM写到标准输出）
    pub output_path: Option<PathBuf>,

    /// 解码前定位到的样本位置
    pub seek_sample: Option<i64>,

    /// 每次从解码器拉取的字节数
    pub chunk_size: usize,

    pub output_format: OutputFormat,

    /// 隐藏文件长度，强制走手动seek
    pub hide_length: bool,

    /// 只显示流参数，不解码
    pub info_only: bool,

    /// 流参数以JSON输出
    pub json: bool,

    /// 是否显示详细信息
    pub verbose: bool,
}

impl AppConfig {
    /// 创建读取指定文件、输出裸PCM的默认配置
    pub fn for_file(path: impl Into<PathBuf>) -> Self {
        Self {
            input: InputSource::File(path.into()),
            output_path: None,
            seek_sample: None,
            chunk_size: defaults::CHUNK_SIZE_BYTES,
            output_format: OutputFormat::RawPcm,
            hide_length: false,
            info_only: false,
            json: false,
            verbose: false,
        }
    }

    #[inline]
    pub fn is_stdin(&self) -> bool {
        self.input == InputSource::Stdin
    }

    /// PCM是否写到标准输出
    #[inline]
    pub fn writes_to_stdout(&self) -> bool {
        !self.info_only && self.output_path.is_none()
    }

    /// 校验参数组合
    pub fn validate(&self) -> AudioResult<()> {
        if self.chunk_size < defaults::MIN_CHUNK_SIZE_BYTES {
            return Err(AudioError::InvalidInput(format!(
                "--chunk-size 至少为 {} 字节 / must be at least {} bytes",
                defaults::MIN_CHUNK_SIZE_BYTES,
                defaults::MIN_CHUNK_SIZE_BYTES
            )));
        }
        if self.output_format == OutputFormat::Wav && self.output_path.is_none() && !self.info_only
        {
            return Err(AudioError::InvalidInput(
                "--wav 需要 --output 指定文件 / --wav requires --output FILE".to_string(),
            ));
        }
        if self.json && !self.info_only {
            return Err(AudioError::InvalidInput(
                "--json 仅与 --info 一起使用 / --json only applies with --info".to_string(),
            ));
        }
        if self.hide_length && self.is_stdin() {
            return Err(AudioError::InvalidInput(
                "--streaming 不适用于标准输入 / --streaming does not apply to stdin".to_string(),
            ));
        }
        Ok(())
    }
}

/// 构建命令行定义
pub fn build_command() -> Command {
    Command::new("flac-pcm-stream")
        .version(VERSION)
        .about(DESCRIPTION)
        .author("MacinMeter Team")
        .arg(
            Arg::new("INPUT")
                .help("FLAC文件路径，或 - 表示标准输入")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .help("输出PCM到文件（默认写到标准输出）")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("seek")
                .long("seek")
                .help("解码前定位到的样本位置（每声道）")
                .value_name("SAMPLE")
                .allow_negative_numbers(true)
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("chunk-size")
                .long("chunk-size")
                .help("每次拉取的字节数（默认 16384）")
                .value_name("BYTES")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("wav")
                .long("wav")
                .help("以WAV容器写出（需要 --output）")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("streaming")
                .long("streaming")
                .help("隐藏文件长度，模拟长度未知的流")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("info")
                .long("info")
                .help("只显示流参数")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("流参数以JSON输出（配合 --info）")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("显示详细处理信息")
                .action(clap::ArgAction::SetTrue),
        )
}

fn config_from_matches(matches: &ArgMatches) -> AppConfig {
    let input = match matches.get_one::<String>("INPUT").map(String::as_str) {
        Some("-") | None => InputSource::Stdin,
        Some(path) => InputSource::File(PathBuf::from(path)),
    };

    AppConfig {
        input,
        output_path: matches.get_one::<String>("output").map(PathBuf::from),
        seek_sample: matches.get_one::<i64>("seek").copied(),
        chunk_size: matches
            .get_one::<usize>("chunk-size")
            .copied()
            .unwrap_or(defaults::CHUNK_SIZE_BYTES),
        output_format: if matches.get_flag("wav") {
            OutputFormat::Wav
        } else {
            OutputFormat::RawPcm
        },
        hide_length: matches.get_flag("streaming"),
        info_only: matches.get_flag("info"),
        json: matches.get_flag("json"),
        verbose: matches.get_flag("verbose"),
    }
}

/// 解析命令行参数并创建配置
pub fn parse_args() -> AppConfig {
    config_from_matches(&build_command().get_matches())
}

/// 从给定参数解析配置（首个元素为程序名）
pub fn parse_args_from<I, T>(args: I) -> AudioResult<AppConfig>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = build_command()
        .try_get_matches_from(args)
        .map_err(|e| AudioError::InvalidInput(e.to_string()))?;
    Ok(config_from_matches(&matches))
}

/// 显示程序启动信息
pub fn show_startup_info(config: &AppConfig) {
    if config.verbose {
        eprintln!("[INFO] flac-pcm-stream v{VERSION}");
        eprintln!("[INFO] {DESCRIPTION}");
    }
}

/// 显示程序完成信息
pub fn show_completion_info(config: &AppConfig) {
    if config.verbose {
        eprintln!("[OK] 处理完成 / Done");
    }
}
