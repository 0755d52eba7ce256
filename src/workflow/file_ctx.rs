//! 文件处理上下文
//!
//! 封装"我正在处理第几个文件、是哪个文件"这一信息

use std::fmt::Display;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct FileCtx {
    /// 文件完整路径
    pub path: PathBuf,

    /// 文件名
    pub file_name: String,

    /// 文件序号（从1开始，仅用于日志显示）
    pub index: usize,

    /// 本次处理的文件总数
    pub total: usize,
}

impl FileCtx {
    pub fn new(path: PathBuf, index: usize, total: usize) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            path,
            file_name,
            index,
            total,
        }
    }
}

impl Display for FileCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}/{} {}]", self.index, self.total, self.file_name)
    }
}
