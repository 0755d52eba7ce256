//! 子目录展平服务
//!
//! 把所有子目录里的文件复制到主目录，源文件保留不动。

use crate::error::{AppError, AppResult, FileError};
use crate::services::scanner::{scan, ScanMode, ScanOptions};
use crate::utils::unique_destination_avoiding;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Default)]
pub struct FlattenReport {
    /// (源相对路径, 目标路径)
    pub copied: Vec<(String, PathBuf)>,
    pub skipped: Vec<String>,
}

/// 展平 `main_folder`，文件名匹配 `ignore` 的文件跳过；
/// 目标重名时改为 `<name>_<n>.<ext>`
pub fn flatten(main_folder: &Path, ignore: Option<&str>, dry_run: bool) -> AppResult<FlattenReport> {
    if !main_folder.is_dir() {
        return Err(FileError::DirectoryNotFound {
            path: main_folder.display().to_string(),
        }
        .into());
    }

    let every = scan(main_folder, &ScanOptions::new(ScanMode::Recursive))?;
    let options = match ignore {
        Some(pattern) => ScanOptions::new(ScanMode::Recursive).with_ignore(pattern)?,
        None => ScanOptions::new(ScanMode::Recursive),
    };
    let kept = scan(main_folder, &options)?;

    let mut report = FlattenReport::default();
    for rel in &every {
        if !kept.contains(rel) {
            info!("Skipping (pattern match): {}", rel);
            report.skipped.push(rel.clone());
        }
    }

    // dry-run 不会真正写文件，已分配的目标名要单独记下
    let mut planned = HashSet::new();
    for rel in kept {
        let file_name = rel.rsplit('/').next().unwrap_or(&rel).to_string();
        let src = main_folder.join(&rel);
        let dst = unique_destination_avoiding(main_folder, &file_name, &planned);
        planned.insert(dst.clone());

        info!("Copying: {} → {}", src.display(), dst.display());
        if !dry_run {
            std::fs::copy(&src, &dst)
                .map_err(|e| AppError::file_write_failed(dst.display().to_string(), e))?;
        }
        report.copied.push((rel, dst));
    }

    info!(
        "✓ 展平完成: 复制 {} 个，跳过 {} 个",
        report.copied.len(),
        report.skipped.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_flatten_with_collisions_and_ignore() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::write(root.join("a.json"), "root").unwrap();
        std::fs::create_dir_all(root.join("one")).unwrap();
        std::fs::create_dir_all(root.join("two/deep")).unwrap();
        std::fs::write(root.join("one/a.json"), "one").unwrap();
        std::fs::write(root.join("two/deep/a.json"), "two").unwrap();
        std::fs::write(root.join("two/review_x.json"), "r").unwrap();

        let report = flatten(root, Some("*review*"), false).unwrap();
        assert_eq!(report.copied.len(), 2);
        assert_eq!(report.skipped, vec!["two/review_x.json"]);

        assert_eq!(std::fs::read_to_string(root.join("a.json")).unwrap(), "root");
        assert_eq!(std::fs::read_to_string(root.join("a_1.json")).unwrap(), "one");
        assert_eq!(std::fs::read_to_string(root.join("a_2.json")).unwrap(), "two");
        assert!(root.join("one/a.json").exists());
        assert!(!root.join("review_x.json").exists());
    }

    #[test]
    fn test_dry_run_plans_distinct_names() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::write(root.join("a.json"), "root").unwrap();
        for sub in ["one", "two", "three"] {
            std::fs::create_dir_all(root.join(sub)).unwrap();
            std::fs::write(root.join(sub).join("a.json"), sub).unwrap();
        }

        let report = flatten(root, None, true).unwrap();
        let mut targets: Vec<_> = report
            .copied
            .iter()
            .map(|(_, dst)| dst.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        targets.sort();
        assert_eq!(targets, vec!["a_1.json", "a_2.json", "a_3.json"]);
        assert!(!root.join("a_1.json").exists());
    }
}
