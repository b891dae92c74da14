//! 统一错误处理框架
//!
//! 流式解码器的错误类型定义。致命错误最终都收敛到解码器的终止状态，
//! 对调用方只表现为 `Err`、`false` 或 0 字节返回，不会 panic。

use std::fmt;
use std::io;

/// 音频处理相关的统一错误类型
#[derive(Debug)]
pub enum AudioError {
    /// 输入验证错误（CLI参数、非法调用）
    InvalidInput(String),

    /// 字节源I/O错误
    IoError(io::Error),

    /// 流格式错误：缺少STREAMINFO、声道数为0、位深越界
    FormatError(String),

    /// 解码引擎错误
    DecodingError(String),

    /// 输出缓冲区内存不足
    OutOfMemory,

    /// 资源访问错误（输出文件、字节源已释放等）
    ResourceError(String),
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioError::InvalidInput(msg) => write!(f, "输入验证失败: {msg}"),
            AudioError::IoError(err) => write!(f, "字节源I/O错误: {err}"),
            AudioError::FormatError(msg) => write!(f, "音频流格式错误: {msg}"),
            AudioError::DecodingError(msg) => write!(f, "音频解码失败: {msg}"),
            AudioError::OutOfMemory => write!(f, "输出缓冲区内存不足"),
            AudioError::ResourceError(msg) => write!(f, "资源访问错误: {msg}"),
        }
    }
}

impl std::error::Error for AudioError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AudioError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for AudioError {
    fn from(err: io::Error) -> Self {
        AudioError::IoError(err)
    }
}

impl From<symphonia::core::errors::Error> for AudioError {
    fn from(err: symphonia::core::errors::Error) -> Self {
        use symphonia::core::errors::Error as SymphoniaError;
        match err {
            SymphoniaError::IoError(e) => AudioError::IoError(e),
            SymphoniaError::Unsupported(what) => {
                AudioError::FormatError(format!("不支持的特性: {what}"))
            }
            other => AudioError::DecodingError(format!("symphonia错误: {other}")),
        }
    }
}

impl From<hound::Error> for AudioError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(e) => AudioError::IoError(e),
            other => AudioError::ResourceError(format!("WAV写入错误: {other}")),
        }
    }
}

/// 音频处理操作的标准Result类型
pub type AudioResult<T> = Result<T, AudioError>;

// ==================== 错误转换Helper函数 ====================

/// 创建格式错误的helper函数
#[inline]
pub fn format_error<E: fmt::Display>(context: &str, err: E) -> AudioError {
    AudioError::FormatError(format!("{context}: {err}"))
}

/// 创建解码错误的helper函数
#[inline]
pub fn decoding_error<E: fmt::Display>(context: &str, err: E) -> AudioError {
    AudioError::DecodingError(format!("{context}: {err}"))
}

// ==================== 错误分类系统 ====================

/// 错误类别枚举（用于CLI退出码与建议文本）
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum ErrorCategory {
    /// 格式相关错误（非FLAC、STREAMINFO缺失或非法）
    Format,
    /// 解码相关错误（引擎失败、数据损坏）
    Decoding,
    /// I/O相关错误（文件不存在、读取失败）
    Io,
    /// 内存相关错误
    Memory,
    /// 其他未分类错误
    Other,
}

impl ErrorCategory {
    /// 从AudioError提取错误类别
    pub fn from_audio_error(e: &AudioError) -> Self {
        match e {
            AudioError::FormatError(_) => Self::Format,
            AudioError::DecodingError(_) => Self::Decoding,
            AudioError::IoError(_) => Self::Io,
            AudioError::OutOfMemory => Self::Memory,
            AudioError::InvalidInput(_) | AudioError::ResourceError(_) => Self::Other,
        }
    }

    /// 获取错误类别的显示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Format => "格式错误",
            Self::Decoding => "解码错误",
            Self::Io => "I/O错误",
            Self::Memory => "内存错误",
            Self::Other => "其他错误",
        }
    }
}
