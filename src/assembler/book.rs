//! 按顺序文件组装书籍

use crate::assembler::BookMeta;
use crate::error::{AppError, AppResult, FileError};
use crate::models::{load_mcq_file, Mcq};
use crate::services::normalizer::strip_numeric_prefix;
use crate::services::WarnWriter;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{info, warn};
use walkdir::WalkDir;

/// 带全书编号的题目
#[derive(Debug, Clone)]
pub struct NumberedMcq {
    pub number: usize,
    pub mcq: Mcq,
}

#[derive(Debug, Clone)]
pub struct Chapter {
    pub title: String,
    /// 目录锚点
    pub slug: String,
    pub source_file: String,
    pub mcqs: Vec<NumberedMcq>,
}

#[derive(Debug, Clone)]
pub struct Book {
    pub meta: BookMeta,
    pub chapters: Vec<Chapter>,
}

impl Book {
    pub fn total_mcqs(&self) -> usize {
        self.chapters.iter().map(|c| c.mcqs.len()).sum()
    }
}

/// 组装统计
#[derive(Debug, Default, Clone)]
pub struct AssemblyReport {
    pub chapters: usize,
    pub mcqs: usize,
    /// 被跳过的文件及原因
    pub skipped_files: Vec<(String, String)>,
    pub skipped_mcqs: usize,
}

/// 读取顺序文件，忽略空行和 `#` 注释
pub fn read_order_lines(path: &Path) -> AppResult<Vec<String>> {
    if !path.exists() {
        return Err(FileError::NotFound {
            path: path.display().to_string(),
        }
        .into());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
    Ok(parse_order_lines(&content))
}

pub fn parse_order_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// 在题目文件夹中找到顺序文件里列出的条目
///
/// 依次尝试：原名 → 补 `.json` → 忽略大小写 → 忽略数字前缀（仅唯一匹配时）。
/// 顶层找不到时再到子目录中按文件名查找（同样只接受唯一匹配）。
pub fn resolve_entry(folder: &Path, listed: &str) -> Option<PathBuf> {
    let exact = folder.join(listed);
    if exact.is_file() {
        return Some(exact);
    }

    let candidate = if listed.to_lowercase().ends_with(".json") {
        listed.to_string()
    } else {
        let with_ext = folder.join(format!("{}.json", listed));
        if with_ext.is_file() {
            return Some(with_ext);
        }
        format!("{}.json", listed)
    };

    let wanted = candidate
        .rsplit('/')
        .next()
        .unwrap_or(&candidate)
        .to_lowercase();

    let top_level = folder_files(folder, 1, 1);
    if let Some((_, path)) = top_level.iter().find(|(name, _)| *name == wanted) {
        return Some(path.clone());
    }
    // order.txt 中的条目带 `NNN_` 前缀，而文件夹可能尚未编号（或反之）
    if let Some(path) = unique_prefixless_match(&top_level, &wanted) {
        return Some(path);
    }

    let nested = folder_files(folder, 2, usize::MAX);
    let mut same_name = nested.iter().filter(|(name, _)| *name == wanted);
    match (same_name.next(), same_name.next()) {
        (Some((_, path)), None) => Some(path.clone()),
        (Some(_), Some(_)) => None,
        _ => unique_prefixless_match(&nested, &wanted),
    }
}

/// 文件夹中的文件：（小写文件名，路径），按文件名排序
fn folder_files(folder: &Path, min_depth: usize, max_depth: usize) -> Vec<(String, PathBuf)> {
    WalkDir::new(folder)
        .min_depth(min_depth)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| (e.file_name().to_string_lossy().to_lowercase(), e.into_path()))
        .collect()
}

fn unique_prefixless_match(entries: &[(String, PathBuf)], wanted: &str) -> Option<PathBuf> {
    let bare = strip_numeric_prefix(wanted);
    let mut matches = entries
        .iter()
        .filter(|(name, _)| strip_numeric_prefix(name) == bare);
    match (matches.next(), matches.next()) {
        (Some((_, path)), None) => Some(path.clone()),
        _ => None,
    }
}

/// 章节标题：去掉数字前缀和扩展名，`_` 换成空格，去掉 ` mcqs`，首字母大写
pub fn chapter_title(file_name: &str) -> String {
    let name = strip_suffix_ignore_case(file_name, ".json");
    let name = strip_numeric_prefix(name).replace('_', " ");
    let name = strip_suffix_ignore_case(&name, " mcqs");
    title_case(name.trim())
}

fn strip_suffix_ignore_case<'a>(text: &'a str, suffix: &str) -> &'a str {
    match text.len().checked_sub(suffix.len()) {
        Some(cut) if text.is_char_boundary(cut) && text[cut..].eq_ignore_ascii_case(suffix) => {
            &text[..cut]
        }
        _ => text,
    }
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn slug_regexes() -> &'static (Regex, Regex, Regex) {
    static RE: OnceLock<(Regex, Regex, Regex)> = OnceLock::new();
    RE.get_or_init(|| {
        (
            Regex::new(r"[^\w\s-]").expect("static regex"),
            Regex::new(r"\s+").expect("static regex"),
            Regex::new(r"-+").expect("static regex"),
        )
    })
}

/// GitHub 风格的标题锚点
pub fn slugify(text: &str) -> String {
    let (punct, space, dashes) = slug_regexes();
    let s = text.to_lowercase();
    let s = punct.replace_all(&s, "");
    let s = space.replace_all(&s, "-");
    let s = dashes.replace_all(&s, "-");
    s.trim_matches('-').to_string()
}

fn option_regexes() -> &'static (Regex, Regex) {
    static RE: OnceLock<(Regex, Regex)> = OnceLock::new();
    RE.get_or_init(|| {
        (
            Regex::new(r"^[*.\-+\s]+|[*.\-+\s]+$").expect("static regex"),
            Regex::new(r"\*+|_+").expect("static regex"),
        )
    })
}

/// 清理选项文本中残留的 `*`、`.`、`_` 等标记
///
/// 首尾的标记全部去掉；中间只去掉 `*` 和 `_`，保留小数点。
pub fn clean_option_text(text: &str) -> String {
    let (edges, inner) = option_regexes();
    let s = edges.replace_all(text, "");
    inner.replace_all(&s, "").trim().to_string()
}

/// 按顺序组装整本书
///
/// 找不到或无法解析的文件会被跳过并记录，不会中断组装。
pub fn build_book(
    folder: &Path,
    order: &[String],
    meta: BookMeta,
    warn_writer: Option<&WarnWriter>,
) -> AppResult<(Book, AssemblyReport)> {
    if !folder.is_dir() {
        return Err(FileError::DirectoryNotFound {
            path: folder.display().to_string(),
        }
        .into());
    }

    let mut report = AssemblyReport::default();
    let mut chapters = Vec::new();
    let mut counter = 1;

    let skip = |report: &mut AssemblyReport, item: &str, reason: String| {
        warn!("⚠️ 跳过 {}: {}", item, reason);
        if let Some(w) = warn_writer {
            if let Err(e) = w.write("build", item, &reason) {
                warn!("写入警告文件失败: {}", e);
            }
        }
        report.skipped_files.push((item.to_string(), reason));
    };

    for listed in order {
        let Some(path) = resolve_entry(folder, listed) else {
            skip(&mut report, listed, "文件不存在".to_string());
            continue;
        };
        let book = match load_mcq_file(&path) {
            Ok(b) => b,
            Err(e) => {
                skip(&mut report, listed, e.to_string());
                continue;
            }
        };

        let source_file = book.source_file.clone().unwrap_or_else(|| listed.clone());
        let title = chapter_title(&source_file);
        let mut mcqs = Vec::with_capacity(book.mcqs.len());
        for mcq in book.mcqs {
            if let Err(field) = mcq.validate() {
                warn!("  [{}] 题目缺少 {}，跳过", source_file, field);
                report.skipped_mcqs += 1;
                continue;
            }
            mcqs.push(NumberedMcq {
                number: counter,
                mcq,
            });
            counter += 1;
        }

        info!("✓ 章节: {} ({} 题)", title, mcqs.len());
        chapters.push(Chapter {
            slug: slugify(&title),
            title,
            source_file,
            mcqs,
        });
    }

    report.chapters = chapters.len();
    report.mcqs = counter - 1;
    Ok((Book { meta, chapters }, report))
}
