//! 文件编号服务 - 业务能力层
//!
//! 给文件加上 `NN_` 前缀。已有的数字前缀会先被剥掉，
//! 所以对同一顺序重复执行不会产生 `01_01_foo.json`。

use crate::error::{AppError, AppResult, DataError, FileError};
use crate::models::list_json_files;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{error, info, warn};

fn prefix_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:\d+_)+").expect("static regex"))
}

/// 去掉所有前导的 `数字_` 前缀：`"001_01_file.json"` -> `"file.json"`
pub fn strip_numeric_prefix(name: &str) -> &str {
    match prefix_regex().find(name) {
        Some(m) if m.end() < name.len() => &name[m.end()..],
        _ => name,
    }
}

/// 编号宽度：至少两位，最后一个编号更长时随之加宽
pub fn prefix_width(count: usize, base: usize) -> usize {
    let last = base.saturating_add(count.saturating_sub(1));
    last.to_string().len().max(2)
}

/// 编号顺序来源
#[derive(Debug, Clone)]
pub enum OrderSource {
    /// 按（去掉前缀后的）文件名字母顺序
    Alphabetical,
    /// 按排序文件中的顺序
    Artifact(PathBuf),
}

/// 一次重命名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamePlan {
    pub from: String,
    pub to: String,
}

impl RenamePlan {
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

/// 执行结果
#[derive(Debug, Default)]
pub struct RenameReport {
    pub renamed: Vec<RenamePlan>,
    pub unchanged: usize,
}

/// 计算编号方案（不修改文件系统）
///
/// 使用排序文件时，未出现在其中的文件按字母顺序排在已列出文件之后；
/// 排序文件中找不到的条目会被警告并忽略。
pub fn plan_renames(
    folder: &Path,
    files: &[String],
    source: &OrderSource,
    base: usize,
) -> AppResult<Vec<RenamePlan>> {
    let mut by_stripped: HashMap<String, String> = HashMap::new();
    for name in files {
        let stripped = strip_numeric_prefix(name).to_string();
        if let Some(existing) = by_stripped.insert(stripped.clone(), name.clone()) {
            return Err(DataError::AmbiguousName {
                name: stripped,
                first: existing,
                second: name.clone(),
            }
            .into());
        }
    }

    let mut alphabetical: Vec<&String> = by_stripped.keys().collect();
    alphabetical.sort();

    let ordered: Vec<String> = match source {
        OrderSource::Alphabetical => alphabetical.into_iter().cloned().collect(),
        OrderSource::Artifact(path) => {
            let listed = read_artifact_names(path)?;
            let mut ordered = Vec::new();
            for entry in listed {
                let stripped = strip_numeric_prefix(&entry).to_string();
                if !by_stripped.contains_key(&stripped) {
                    warn!("⚠️ 排序文件中的条目在 {} 中不存在: {}", folder.display(), entry);
                    continue;
                }
                if !ordered.contains(&stripped) {
                    ordered.push(stripped);
                }
            }
            for name in alphabetical {
                if !ordered.contains(name) {
                    ordered.push(name.clone());
                }
            }
            ordered
        }
    };

    if base.checked_add(ordered.len().saturating_sub(1)).is_none() {
        return Err(DataError::NumberingOverflow {
            base,
            count: ordered.len(),
        }
        .into());
    }
    let width = prefix_width(ordered.len(), base);
    Ok(ordered
        .into_iter()
        .enumerate()
        .map(|(i, stripped)| {
            let from = by_stripped[&stripped].clone();
            let to = format!("{:0width$}_{}", base + i, stripped, width = width);
            RenamePlan { from, to }
        })
        .collect())
}

fn read_artifact_names(path: &Path) -> AppResult<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|l| l.rsplit('/').next().unwrap_or(l).to_string())
        .collect())
}

/// 执行重命名
///
/// 分两步：先全部改成临时名，再改成目标名，避免互换名字时互相覆盖。
pub fn apply_renames(folder: &Path, plan: &[RenamePlan], dry_run: bool) -> AppResult<RenameReport> {
    let mut report = RenameReport::default();
    let pending: Vec<&RenamePlan> = plan.iter().filter(|p| !p.is_noop()).collect();
    report.unchanged = plan.len() - pending.len();

    if dry_run {
        for p in &pending {
            info!("[dry-run] {} -> {}", p.from, p.to);
            report.renamed.push((*p).clone());
        }
        return Ok(report);
    }

    let stamp = std::process::id();
    let staged: Vec<(String, &RenamePlan)> = pending
        .iter()
        .enumerate()
        .map(|(i, p)| (format!(".renaming_{}_{}.tmp", stamp, i), *p))
        .collect();

    for (moved, (tmp_name, p)) in staged.iter().enumerate() {
        if let Err(e) = rename(folder, &p.from, tmp_name) {
            roll_back(folder, &staged[..moved], 0);
            return Err(e);
        }
    }
    for (finished, (tmp_name, p)) in staged.iter().enumerate() {
        if let Err(e) = rename(folder, tmp_name, &p.to) {
            roll_back(folder, &staged, finished);
            return Err(e);
        }
        info!("Renamed: {} -> {}", p.from, p.to);
        report.renamed.push((*p).clone());
    }

    Ok(report)
}

/// 出错后恢复原文件名
///
/// `staged` 中的文件都已改为临时名，其中前 `finished` 个又已改为目标名。
fn roll_back(folder: &Path, staged: &[(String, &RenamePlan)], finished: usize) {
    warn!("⚠️ 重命名中断，恢复原文件名");
    for (tmp_name, p) in &staged[..finished] {
        if let Err(e) = rename(folder, &p.to, tmp_name) {
            error!("恢复失败: {}", e);
        }
    }
    for (tmp_name, p) in staged {
        if let Err(e) = rename(folder, tmp_name, &p.from) {
            error!("恢复失败: {}", e);
        }
    }
}

fn rename(folder: &Path, from: &str, to: &str) -> AppResult<()> {
    std::fs::rename(folder.join(from), folder.join(to)).map_err(|source| {
        FileError::RenameFailed {
            from: from.to_string(),
            to: to.to_string(),
            source,
        }
        .into()
    })
}

/// 为文件夹顶层的 JSON 文件编号
pub fn normalize_folder(
    folder: &Path,
    source: &OrderSource,
    base: usize,
    dry_run: bool,
) -> AppResult<RenameReport> {
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

    let plan = plan_renames(folder, &files, source, base)?;
    let report = apply_renames(folder, &plan, dry_run)?;
    info!(
        "✓ 编号完成: 重命名 {} 个，未变化 {} 个",
        report.renamed.len(),
        report.unchanged
    );
    Ok(report)
}

/// 列表文件中被修改的一行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineChange {
    pub line: usize,
    pub before: String,
    pub after: String,
}

/// 去掉列表文件每一行的数字前缀，写回 `output`（缺省为原文件）
pub fn strip_prefixes_in_list(
    input: &Path,
    output: Option<&Path>,
    dry_run: bool,
) -> AppResult<Vec<LineChange>> {
    let bytes = std::fs::read(input)
        .map_err(|e| AppError::file_read_failed(input.display().to_string(), e))?;
    // 非 UTF-8 文件按 Latin-1 兜底
    let content = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    };

    let mut changes = Vec::new();
    let mut out = String::new();
    for (i, raw) in content.lines().enumerate() {
        let original = raw.trim();
        let stripped = strip_numeric_prefix(original);
        if stripped != original {
            changes.push(LineChange {
                line: i + 1,
                before: original.to_string(),
                after: stripped.to_string(),
            });
        }
        out.push_str(stripped);
        out.push('\n');
    }

    if changes.is_empty() {
        info!("没有发现带数字前缀的行");
        return Ok(changes);
    }

    for c in &changes {
        info!("  第 {} 行: {} → {}", c.line, c.before, c.after);
    }

    if dry_run {
        warn!("⚠️ dry-run 模式，未保存任何修改");
    } else {
        let target = output.unwrap_or(input);
        std::fs::write(target, out)
            .map_err(|e| AppError::file_write_failed(target.display().to_string(), e))?;
        info!("✓ 已保存到: {}", target.display());
    }
    Ok(changes)
}
