//! 字节源模块
//!
//! 定义解码器读取压缩数据所用的随机访问字节源契约，以及三种常用实现：
//! 内存、文件、只进流（stdin/管道）。

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// 随机访问字节源
///
/// # 契约
///
/// - `read_at` 返回 `Ok(n > 0)` 表示已拷贝 n 字节；`Ok(0)` 表示该位置已无数据
///   （位置 ≥ 源长度时也必须返回 0，而不是错误）；`Err(_)` 表示读取失败，会中止解码
/// - `size` 返回总字节数，`None` 表示长度未知（此时解码器改用手动seek）
/// - `release` 在解码器拆除时恰好调用一次，且此时不再有任何读取
/// - 不要求线程安全：同一解码器实例只会在单一逻辑线程上调用
pub trait ByteSource: Send {
    /// 从 `position` 处读取最多 `buf.len()` 字节
    fn read_at(&mut self, position: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// 总字节数，未知时返回 None
    fn size(&self) -> Option<u64>;

    /// 释放底层资源
    fn release(&mut self) {}
}

/// 内存字节源
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Vec<u8>,
    report_size: bool,
}

impl MemorySource {
    /// 创建报告真实长度的内存源（可原生seek）
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            report_size: true,
        }
    }

    /// 创建隐藏长度的内存源，模拟长度未知的流
    pub fn unsized_stream(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            report_size: false,
        }
    }
}

impl ByteSource for MemorySource {
    fn read_at(&mut self, position: u64, buf: &mut [u8]) -> io::Result<usize> {
        let len = self.data.len() as u64;
        if position >= len {
            return Ok(0);
        }
        let start = position as usize;
        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        Ok(n)
    }

    fn size(&self) -> Option<u64> {
        self.report_size.then_some(self.data.len() as u64)
    }
}

/// 文件字节源
#[derive(Debug)]
pub struct FileSource {
    file: File,
    len: Option<u64>,
}

impl FileSource {
    /// 打开文件并读取其长度
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            file,
            len: Some(len),
        })
    }

    /// 打开文件但隐藏长度（强制手动seek路径）
    pub fn open_unsized(path: impl AsRef<Path>) -> io::Result<Self> {
        let mut source = Self::open(path)?;
        source.len = None;
        Ok(source)
    }
}

impl ByteSource for FileSource {
    fn read_at(&mut self, position: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.file.seek(SeekFrom::Start(position))?;
        loop {
            match self.file.read(buf) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => return other,
            }
        }
    }

    fn size(&self) -> Option<u64> {
        self.len
    }
}

/// 只进流字节源（stdin、管道、网络流）
///
/// 长度永远未知。读取当前位置正常进行；向前的空洞通过读取并丢弃跳过；
/// 向后的位置无法满足，返回 `Unsupported` 错误。
pub struct ReaderSource<R: Read + Send> {
    reader: R,
    position: u64,
}

impl<R: Read + Send> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            position: 0,
        }
    }

    /// 已从底层读取器消费的字节数
    pub fn position(&self) -> u64 {
        self.position
    }

    fn skip_forward(&mut self, target: u64) -> io::Result<bool> {
        let mut scratch = [0u8; 4096];
        while self.position < target {
            let want = (target - self.position).min(scratch.len() as u64) as usize;
            let n = self.read_some(&mut scratch[..want])?;
            if n == 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn read_some(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.reader.read(buf) {
                Ok(n) => {
                    self.position += n as u64;
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl<R: Read + Send> ByteSource for ReaderSource<R> {
    fn read_at(&mut self, position: u64, buf: &mut [u8]) -> io::Result<usize> {
        if position < self.position {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!(
                    "只进流无法回退: 请求位置 {position}，当前位置 {}",
                    self.position
                ),
            ));
        }
        if position > self.position && !self.skip_forward(position)? {
            return Ok(0);
        }
        self.read_some(buf)
    }

    fn size(&self) -> Option<u64> {
        None
    }
}
