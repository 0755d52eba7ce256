//! 文件系统辅助函数

use crate::error::{AppError, AppResult};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// 原子写入：先写到同目录的临时文件，再整体替换目标文件
pub fn atomic_write(path: &Path, contents: &[u8]) -> AppResult<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)
        .map_err(|e| AppError::file_write_failed(parent.display().to_string(), e))?;

    let mut tmp = NamedTempFile::new_in(&parent)
        .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;
    tmp.write_all(contents)
        .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;
    tmp.persist(path)?;
    Ok(())
}

/// 在 `dir` 下为 `file_name` 找一个不会覆盖已有文件的路径
///
/// `a.json` 已存在时依次尝试 `a_1.json`、`a_2.json` ……
pub fn unique_destination(dir: &Path, file_name: &str) -> PathBuf {
    unique_destination_avoiding(dir, file_name, &HashSet::new())
}

/// 同上，另外避开 `reserved` 中已分配（但尚未写出）的路径
pub fn unique_destination_avoiding(
    dir: &Path,
    file_name: &str,
    reserved: &HashSet<PathBuf>,
) -> PathBuf {
    let free = |p: &PathBuf| !p.exists() && !reserved.contains(p);

    let candidate = dir.join(file_name);
    if free(&candidate) {
        return candidate;
    }

    let (stem, ext) = split_extension(file_name);
    let mut counter = 1;
    loop {
        let name = format!("{}_{}{}", stem, counter, ext);
        let candidate = dir.join(name);
        if free(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// `"a.b.json"` -> `("a.b", ".json")`；没有扩展名时后半部分为空
pub fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(0) | None => (file_name, ""),
        Some(idx) => file_name.split_at(idx),
    }
}
