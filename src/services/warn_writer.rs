//! 警告写入服务 - 业务能力层
//!
//! 把被跳过的条目（找不到的文件、损坏的 JSON、生成失败等）追加到
//! 一个文本文件里，方便事后手动重跑。

use crate::error::{AppError, AppResult};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// 默认警告文件名
pub const DEFAULT_WARN_FILE: &str = "warn.txt";

/// 警告写入服务
///
/// 批量处理时会被多个任务共享，内部用锁保证每行完整写入。
pub struct WarnWriter {
    warn_file_path: PathBuf,
    lock: Mutex<()>,
}

impl WarnWriter {
    /// 在指定目录下使用默认文件名
    pub fn in_folder(folder: &Path) -> Self {
        Self::with_path(folder.join(DEFAULT_WARN_FILE))
    }

    /// 使用自定义文件路径创建
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            warn_file_path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.warn_file_path
    }

    /// 追加一条警告：`时间 | 工具 | 条目 | 原因`
    pub fn write(&self, tool: &str, item: &str, reason: &str) -> AppResult<()> {
        debug!("写入警告: {} | {} | {}", tool, item, reason);

        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.warn_file_path)
            .map_err(|e| AppError::file_write_failed(self.warn_file_path.display().to_string(), e))?;

        let line = format!(
            "{} | {} | {} | {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            tool,
            item,
            reason.replace('\n', " ")
        );
        file.write_all(line.as_bytes())
            .map_err(|e| AppError::file_write_failed(self.warn_file_path.display().to_string(), e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_appends_one_line_per_warning() {
        let dir = TempDir::new().unwrap();
        let writer = WarnWriter::in_folder(dir.path());
        writer.write("build", "gone.json", "not found").unwrap();
        writer.write("generate", "x_mcqs.json", "HTTP 500\nretry later").unwrap();

        let content = std::fs::read_to_string(writer.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("| build | gone.json | not found"));
        assert!(lines[1].ends_with("HTTP 500 retry later"));
    }
}
