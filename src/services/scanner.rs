//! 目录扫描服务 - 业务能力层
//!
//! 只负责"列出文件"能力，其他工具都建立在它之上

use crate::error::{AppResult, DataError, FileError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

/// 扫描范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// 只看当前目录
    TopLevel,
    /// 跳过当前目录，只看直接子目录
    ImmediateSubfolders,
    /// 跳过当前目录，递归所有子目录
    Recursive,
    /// 当前目录及所有子目录
    All,
}

impl ScanMode {
    pub fn description(&self) -> &'static str {
        match self {
            ScanMode::TopLevel => "Current folder only",
            ScanMode::ImmediateSubfolders => "Immediate subfolders only",
            ScanMode::Recursive => "All subfolders recursively (with hierarchy)",
            ScanMode::All => "Current folder and all subfolders",
        }
    }

    fn depth_range(&self) -> (usize, usize) {
        match self {
            ScanMode::TopLevel => (1, 1),
            ScanMode::ImmediateSubfolders => (2, 2),
            ScanMode::Recursive => (2, usize::MAX),
            ScanMode::All => (1, usize::MAX),
        }
    }
}

/// 扫描选项
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub mode: ScanMode,
    /// 只保留该扩展名（不区分大小写，不带点）
    pub extension: Option<String>,
    /// 文件名匹配该通配符时忽略
    pub ignore: Option<glob::Pattern>,
}

impl ScanOptions {
    pub fn new(mode: ScanMode) -> Self {
        Self {
            mode,
            extension: None,
            ignore: None,
        }
    }

    pub fn with_extension(mut self, ext: impl Into<String>) -> Self {
        self.extension = Some(ext.into().trim_start_matches('.').to_string());
        self
    }

    pub fn with_ignore(mut self, pattern: &str) -> AppResult<Self> {
        let compiled = glob::Pattern::new(pattern).map_err(|source| DataError::BadPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        self.ignore = Some(compiled);
        Ok(self)
    }

    fn accepts(&self, file_name: &str) -> bool {
        if let Some(ext) = &self.extension {
            let matches = Path::new(file_name)
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case(ext))
                .unwrap_or(false);
            if !matches {
                return false;
            }
        }
        if let Some(ignore) = &self.ignore {
            if ignore.matches(file_name) {
                return false;
            }
        }
        true
    }
}

/// 扫描目录，返回以 `/` 分隔的相对路径
///
/// 同一目录内按文件名排序，保证扫描顺序稳定。
pub fn scan(folder: &Path, options: &ScanOptions) -> AppResult<Vec<String>> {
    if !folder.is_dir() {
        return Err(FileError::DirectoryNotFound {
            path: folder.display().to_string(),
        }
        .into());
    }

    let (min_depth, max_depth) = options.mode.depth_range();
    let walker = WalkDir::new(folder)
        .min_depth(min_depth)
        .max_depth(max_depth)
        .sort_by_file_name();

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !options.accepts(&name) {
            debug!("忽略文件: {}", name);
            continue;
        }
        let relative = entry.path().strip_prefix(folder).unwrap_or(entry.path());
        files.push(to_slash_path(relative));
    }

    info!("✓ 扫描完成，共 {} 个文件 ({})", files.len(), options.mode.description());
    Ok(files)
}

fn to_slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

fn parent_dir(path: &str) -> &str {
    path.rfind('/').map(|idx| &path[..idx]).unwrap_or("")
}

/// 排除"已完成"的目录
///
/// 某个目录里只要有文件名以 `marker` 开头的文件，该目录及其子目录下的
/// 所有文件都会被排除。标记文件在根目录时只排除根目录本身的文件。
pub fn exclude_marked_dirs(files: &[String], marker: &str) -> Vec<String> {
    let marked: BTreeSet<&str> = files
        .iter()
        .filter(|f| {
            let name = f.rsplit('/').next().unwrap_or(f);
            name.starts_with(marker)
        })
        .map(|f| parent_dir(f))
        .collect();

    for dir in &marked {
        info!("发现标记 '{}' 的目录: {}", marker, if dir.is_empty() { "." } else { dir });
    }

    files
        .iter()
        .filter(|f| {
            let dir = parent_dir(f);
            !marked.iter().any(|bad| {
                if bad.is_empty() {
                    dir.is_empty()
                } else {
                    dir == *bad || dir.starts_with(&format!("{}/", bad))
                }
            })
        })
        .cloned()
        .collect()
}

/// 扫描结果报告（写入 JSON）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileListing {
    pub directory_scanned: String,
    pub mode: ScanMode,
    pub description: String,
    pub files: Vec<String>,
    #[serde(default)]
    pub filtered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_pattern: Option<String>,
}

impl FileListing {
    pub fn new(folder: &Path, mode: ScanMode, files: Vec<String>) -> Self {
        Self {
            directory_scanned: folder.display().to_string(),
            mode,
            description: mode.description().to_string(),
            files,
            filtered: false,
            filter_pattern: None,
        }
    }

    /// 应用完成标记过滤，返回排除的条目数
    pub fn filter_marked(&mut self, marker: &str) -> usize {
        let before = self.files.len();
        self.files = exclude_marked_dirs(&self.files, marker);
        self.filtered = true;
        self.filter_pattern = Some(marker.to_string());
        before - self.files.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "{}").unwrap();
    }

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "b.json");
        touch(dir.path(), "a.json");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "sub/c.json");
        touch(dir.path(), "sub/deep/d.json");
        dir
    }

    #[test]
    fn test_scan_modes() {
        let dir = fixture();
        let top = scan(dir.path(), &ScanOptions::new(ScanMode::TopLevel)).unwrap();
        assert_eq!(top, vec!["a.json", "b.json", "notes.txt"]);

        let sub = scan(dir.path(), &ScanOptions::new(ScanMode::ImmediateSubfolders)).unwrap();
        assert_eq!(sub, vec!["sub/c.json"]);

        let rec = scan(dir.path(), &ScanOptions::new(ScanMode::Recursive)).unwrap();
        assert_eq!(rec, vec!["sub/c.json", "sub/deep/d.json"]);

        let all = scan(
            dir.path(),
            &ScanOptions::new(ScanMode::All).with_extension("json"),
        )
        .unwrap();
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_ignore_pattern() {
        let dir = fixture();
        touch(dir.path(), "review_a.json");
        let options = ScanOptions::new(ScanMode::TopLevel)
            .with_extension(".json")
            .with_ignore("*review*")
            .unwrap();
        assert_eq!(scan(dir.path(), &options).unwrap(), vec!["a.json", "b.json"]);
    }

    #[test]
    fn test_exclude_marked_dirs() {
        let files: Vec<String> = [
            "x.json",
            "done/done_ok.txt",
            "done/a.json",
            "done/inner/b.json",
            "donelike/c.json",
            "open/d.json",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let kept = exclude_marked_dirs(&files, "done_");
        assert_eq!(kept, vec!["x.json", "donelike/c.json", "open/d.json"]);
    }

    #[test]
    fn test_marker_in_root_only_excludes_root_files() {
        let files: Vec<String> = ["done_root", "a.json", "sub/b.json"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut listing = FileListing::new(Path::new("."), ScanMode::All, files);
        assert_eq!(listing.filter_marked("done_"), 2);
        assert_eq!(listing.files, vec!["sub/b.json"]);
        assert!(listing.filtered);
    }
}
