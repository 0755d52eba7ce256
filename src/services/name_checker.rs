//! 文件名与 disease 字段一致性检查
//!
//! 文件名应当是 disease 字段的规范化形式。不一致的文件会被复制到
//! 子目录中并使用规范名，原文件不动。

use crate::error::{AppResult, DataError};
use crate::models::{list_json_files, load_mcq_file};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{info, warn};

/// 默认的输出子目录
pub const RENAMED_SUBFOLDER: &str = "renamed_files";

fn separators() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[<>:"/\\|?*\s]+"#).expect("static regex"))
}

/// 规范文件名：`"Wilms Tumor / Nephroblastoma"` -> `"wilms_tumor_nephroblastoma.json"`
pub fn canonical_file_name(disease: &str) -> String {
    let replaced = separators().replace_all(disease, "_");
    let mut collapsed = String::with_capacity(replaced.len());
    for ch in replaced.chars() {
        if ch == '_' && collapsed.ends_with('_') {
            continue;
        }
        collapsed.push(ch);
    }
    format!("{}.json", collapsed.trim_matches('_').to_lowercase())
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NameCheckStats {
    pub total: usize,
    pub correct: usize,
    pub renamed: usize,
    pub errors: usize,
}

/// 检查文件夹内所有 JSON 文件
pub fn check_names(folder: &Path, target_subfolder: &str) -> AppResult<NameCheckStats> {
    let target = folder.join(target_subfolder);
    let mut stats = NameCheckStats::default();

    for path in list_json_files(folder)? {
        stats.total += 1;
        let current = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let book = match load_mcq_file(&path) {
            Ok(book) => book,
            Err(e) => {
                warn!("⚠️ 跳过 {}: {}", current, e);
                stats.errors += 1;
                continue;
            }
        };

        let Some(disease) = book.disease.as_deref().filter(|d| !d.trim().is_empty()) else {
            let e = DataError::MissingDisease {
                path: current.clone(),
            };
            warn!("⚠️ 跳过 {}: {}", current, e);
            stats.errors += 1;
            continue;
        };

        let expected = canonical_file_name(disease);
        if current.to_lowercase() == expected {
            info!("✅ {} - correct", current);
            stats.correct += 1;
            continue;
        }

        std::fs::create_dir_all(&target)
            .map_err(|e| crate::AppError::file_write_failed(target.display().to_string(), e))?;
        let destination = target.join(&expected);
        std::fs::copy(&path, &destination)
            .map_err(|e| crate::AppError::file_write_failed(destination.display().to_string(), e))?;
        info!("📝 {} → {}/{}", current, target_subfolder, expected);
        stats.renamed += 1;
    }

    info!(
        "✓ 检查完成: 共 {} 个, 正确 {} 个, 复制 {} 个, 错误 {} 个",
        stats.total, stats.correct, stats.renamed, stats.errors
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_canonical_file_name() {
        assert_eq!(
            canonical_file_name("Wilms Tumor / Nephroblastoma"),
            "wilms_tumor_nephroblastoma.json"
        );
        assert_eq!(canonical_file_name("  Burns  "), "burns.json");
        assert_eq!(canonical_file_name("A__B"), "a_b.json");
    }

    #[test]
    fn test_check_names() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("burns.json"), r#"{"disease": "Burns"}"#).unwrap();
        std::fs::write(dir.path().join("x.json"), r#"{"disease": "Pyloric Stenosis"}"#).unwrap();
        std::fs::write(dir.path().join("y.json"), r#"{"mcqs": []}"#).unwrap();

        let stats = check_names(dir.path(), RENAMED_SUBFOLDER).unwrap();
        assert_eq!(
            stats,
            NameCheckStats {
                total: 3,
                correct: 1,
                renamed: 1,
                errors: 1
            }
        );
        assert!(dir
            .path()
            .join(RENAMED_SUBFOLDER)
            .join("pyloric_stenosis.json")
            .exists());
        assert!(dir.path().join("x.json").exists());
    }
}
