//! 排序文件服务 - 业务能力层
//!
//! 负责生成初始顺序、读取已有排序文件、写出排序结果。
//! 排序结果每次都写到新的带时间戳的文件，从不原地修改。

use crate::error::{AppError, AppResult, FileError, OrderError};
use crate::models::list_json_files;
use crate::services::normalizer::strip_numeric_prefix;
use crate::services::scanner::{scan, ScanMode, ScanOptions};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// 主排序文件名
pub const MASTER_ORDER_FILE: &str = "order.txt";

/// 带时间戳的排序文件名：`ordered_20240115_143022.txt`
pub fn artifact_file_name(now: DateTime<Local>) -> String {
    format!("ordered_{}.txt", now.format("%Y%m%d_%H%M%S"))
}

/// 扫描文件夹顶层的 JSON 文件作为初始顺序（按文件名排序）
///
/// 文件夹为空或无法读取时返回错误，调用方不应写出任何文件。
pub fn initial_order(folder: &Path) -> AppResult<Vec<String>> {
    let files: Vec<String> = list_json_files(folder)?
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .collect();

    if files.is_empty() {
        return Err(FileError::EmptyDirectory {
            path: folder.display().to_string(),
        }
        .into());
    }
    Ok(files)
}

/// 写出带时间戳的排序文件，每行一个文件名
///
/// 同一秒内重复生成时追加 `_1`、`_2`，不会覆盖已有文件。
pub fn write_artifact(folder: &Path, items: &[String], now: DateTime<Local>) -> AppResult<PathBuf> {
    let path = crate::utils::unique_destination(folder, &artifact_file_name(now));
    let mut content = String::new();
    for name in items {
        content.push_str(name);
        content.push('\n');
    }
    std::fs::write(&path, content)
        .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;
    info!("✓ 排序文件已生成: {}", path.display());
    Ok(path)
}

/// 覆盖主排序文件 `order.txt`，每行 `NNN_<去前缀文件名>`
pub fn write_master_order(folder: &Path, items: &[String]) -> AppResult<PathBuf> {
    let path = folder.join(MASTER_ORDER_FILE);
    write_numbered_list(&path, items)?;
    info!("✓ 主排序文件已更新: {}", path.display());
    Ok(path)
}

/// 写出带编号的顺序文件
///
/// 只保留文件名（子目录路径去掉），`order.txt` 的读取方会在子目录中查找。
pub fn write_numbered_list(path: &Path, items: &[String]) -> AppResult<()> {
    let content: String = items
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{:03}_{}\n", i + 1, strip_numeric_prefix(file_name_of(name))))
        .collect();
    std::fs::write(path, content)
        .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))
}

/// 已加载的排序文件
#[derive(Debug, Clone)]
pub struct LoadedOrder {
    pub folder: PathBuf,
    /// 排序文件中能找到对应文件的行（保持原样）
    pub entries: Vec<String>,
    /// 每个条目对应的实际相对路径
    pub resolved: Vec<String>,
}

/// 读取已有排序文件以继续排序
///
/// 每行先去掉所有数字前缀，再在排序文件所在目录（含子目录）中查找
/// 以该名字结尾的 JSON 文件；找不到的行会被警告并丢弃。
pub fn load_order_file(order_path: &Path) -> AppResult<LoadedOrder> {
    let folder = order_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let content = std::fs::read_to_string(order_path)
        .map_err(|e| AppError::file_read_failed(order_path.display().to_string(), e))?;

    let candidates = scan(&folder, &ScanOptions::new(ScanMode::All).with_extension("json"))?;

    let mut entries = Vec::new();
    let mut resolved = Vec::new();
    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let base = strip_numeric_prefix(line);
        match find_actual_file(&candidates, base) {
            Some(found) => {
                entries.push(line.to_string());
                resolved.push(found.to_string());
            }
            None => warn!("⚠️ 文件不存在: {} (来自行: {})", base, line),
        }
    }

    if entries.is_empty() {
        return Err(OrderError::NothingResolved {
            folder: folder.display().to_string(),
        }
        .into());
    }

    info!("✓ 已加载排序文件，共 {} 个条目", entries.len());
    Ok(LoadedOrder {
        folder,
        entries,
        resolved,
    })
}

/// 在候选相对路径中找文件名以 `base` 结尾的文件，先区分大小写再不区分
fn find_actual_file<'a>(candidates: &'a [String], base: &str) -> Option<&'a str> {
    candidates
        .iter()
        .find(|c| file_name_of(c).ends_with(base))
        .or_else(|| {
            let lower = base.to_lowercase();
            candidates
                .iter()
                .find(|c| file_name_of(c).to_lowercase().ends_with(&lower))
        })
        .map(String::as_str)
}

fn file_name_of(rel: &str) -> &str {
    rel.rsplit('/').next().unwrap_or(rel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_artifact_name_embeds_timestamp() {
        let now = Local.with_ymd_and_hms(2024, 1, 15, 14, 30, 22).unwrap();
        assert_eq!(artifact_file_name(now), "ordered_20240115_143022.txt");
    }

    #[test]
    fn test_empty_folder_writes_nothing() {
        let dir = TempDir::new().unwrap();
        assert!(initial_order(dir.path()).is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_artifact_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let now = Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let items = vec!["b.json".to_string(), "a.json".to_string()];

        let first = write_artifact(dir.path(), &items, now).unwrap();
        let second = write_artifact(dir.path(), &items, now).unwrap();
        assert_ne!(first, second);
        assert_eq!(std::fs::read_to_string(first).unwrap(), "b.json\na.json\n");
    }

    #[test]
    fn test_master_order_strips_then_renumbers() {
        let dir = TempDir::new().unwrap();
        let items = vec!["002_b.json".to_string(), "a.json".to_string()];
        let path = write_master_order(dir.path(), &items).unwrap();
        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "001_b.json\n002_a.json\n"
        );
    }

    #[test]
    fn test_master_order_drops_subfolder_paths() {
        let dir = TempDir::new().unwrap();
        let items = vec!["sub/01_burns_mcqs.json".to_string(), "a_mcqs.json".to_string()];
        let path = write_master_order(dir.path(), &items).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "001_burns_mcqs.json\n002_a_mcqs.json\n"
        );
    }

    #[test]
    fn test_load_order_file_resolves_prefixed_and_nested() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("01_abdominal_trauma_mcqs.json"), "{}").unwrap();
        std::fs::create_dir_all(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/Burns_mcqs.json"), "{}").unwrap();
        let order = dir.path().join("order.txt");
        std::fs::write(
            &order,
            "001_burns_mcqs.json\n002_abdominal_trauma_mcqs.json\n003_gone.json\n",
        )
        .unwrap();

        let loaded = load_order_file(&order).unwrap();
        assert_eq!(
            loaded.entries,
            vec!["001_burns_mcqs.json", "002_abdominal_trauma_mcqs.json"]
        );
        assert_eq!(
            loaded.resolved,
            vec!["sub/Burns_mcqs.json", "01_abdominal_trauma_mcqs.json"]
        );
    }
}
