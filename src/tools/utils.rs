//! 工具函数模块
//!
//! 提供文件路径处理等通用工具函数。

/// 文件路径处理工具函数
pub mod path {
    use std::fs::File;
    use std::io::{self, Read};
    use std::path::Path;

    /// FLAC流开头的标记
    pub const FLAC_MARKER: &[u8; 4] = b"fLaC";

    /// 提取文件名（返回String，用于日志显示）
    #[inline]
    pub fn extract_filename_lossy(path: &Path) -> String {
        path.file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }

    /// 提取文件扩展名（大写）
    #[inline]
    pub fn extract_extension_uppercase(path: &Path) -> String {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|s| s.to_uppercase())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    /// 扩展名是否像FLAC文件（.flac / .fla）
    #[inline]
    pub fn looks_like_flac(path: &Path) -> bool {
        matches!(extract_extension_uppercase(path).as_str(), "FLAC" | "FLA")
    }

    /// 文件开头是否为 `fLaC` 标记（不足4字节视为否）
    pub fn has_flac_marker(path: &Path) -> io::Result<bool> {
        let mut head = [0u8; 4];
        let mut filled = 0;
        let mut file = File::open(path)?;
        while filled < head.len() {
            match file.read(&mut head[filled..])? {
                0 => return Ok(false),
                n => filled += n,
            }
        }
        Ok(&head == FLAC_MARKER)
    }
}

pub use path::{
    extract_extension_uppercase, extract_filename_lossy, has_flac_marker, looks_like_flac,
};
