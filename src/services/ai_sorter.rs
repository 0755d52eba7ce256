//! 按教材结构排序 - 业务能力层
//!
//! 把每个题目文件的摘要发给模型，让它按儿外科教材的章节顺序排好，
//! 再校验结果（补上被模型漏掉的文件），最后写出编号的顺序文件。
//! 调用或解析失败时退回按文件名数字前缀排序。

use crate::error::{AppError, AppResult, FileError};
use crate::models::{list_json_files, load_mcq_file};
use crate::services::generator::disease_of;
use crate::services::llm_service::{extract_json, ChatBackend};
use crate::services::ordering::write_numbered_list;
use crate::utils::logging::truncate_text;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// 排序使用的系统提示词
pub const SORT_SYSTEM_PROMPT: &str = "Medical curriculum design expert. Return only JSON.";

const SORT_INSTRUCTIONS: &str = r#"Sort these pediatric surgery MCQ files according to STANDARD PEDIATRIC SURGERY TEXTBOOK STRUCTURE:

1. BASIC PRINCIPLES (first)
   - Embryology fundamentals, clinical outcomes/quality improvement, ethics, anesthesia, nutrition support
2. REGION/SYSTEM-BASED SECTIONS (after basic principles)
   - HEAD & NECK (torticollis, neck cysts, salivary glands)
   - CHEST (chest wall deformities, lung/mediastinal cysts, diaphragmatic hernia)
   - CARDIOVASCULAR (neonatal CV physiology, ECLS, heart transplantation)
   - TRAUMA (abdominal trauma, burns, CNS injuries, vascular injury, splenic trauma)
   - ONCOLOGY (neuroblastoma, Wilms tumor, liver/bone/brain tumors, RMS, lymphoma, teratomas, ovarian/testicular tumors)
   - GASTROINTESTINAL TRACT (esophagus, stomach, small intestine, large intestine, anorectal malformations)
   - LIVER/BILIARY (choledochal cyst, gallbladder disease, liver infections, jaundiced infant)
   - PANCREAS
   - ABDOMINAL WALL (defects, umbilical disorders, hernias)
   - ACUTE ABDOMEN (appendicitis, intussusception, NEC)
   - GENITOURINARY (kidney, ureter, bladder, urethra, testis)
   - VASCULAR ANOMALIES
   - TRANSPLANTATION (liver, kidney, intestine)

Return ONLY a JSON object listing every filename exactly once:
{"sorted_files": ["01_filename.json", "02_filename.json", ...]}"#;

/// 一个题目文件的摘要
#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub filename: String,
    pub disease: String,
    /// 前三道题的题干（截断到 100 字符）
    pub key_concepts: Vec<String>,
    pub question_count: usize,
}

/// 读取单个文件的摘要
pub fn summarize_file(path: &Path) -> AppResult<FileSummary> {
    let book = load_mcq_file(path)?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let key_concepts = book
        .mcqs
        .iter()
        .take(3)
        .map(|m| m.question.trim())
        .filter(|q| !q.is_empty())
        .map(|q| truncate_text(q, 100))
        .collect();

    Ok(FileSummary {
        disease: disease_of(&book, &filename),
        question_count: book.mcqs.len(),
        key_concepts,
        filename,
    })
}

/// 文件夹顶层所有 JSON 文件的摘要，读不了或解析不了的文件跳过
pub fn collect_summaries(folder: &Path) -> AppResult<Vec<FileSummary>> {
    let mut summaries = Vec::new();
    for path in list_json_files(folder)? {
        match summarize_file(&path) {
            Ok(s) => summaries.push(s),
            Err(e) => warn!("⚠️ 跳过 {}: {}", path.display(), e),
        }
    }
    Ok(summaries)
}

/// 排序请求的用户消息
pub fn build_sort_request(summaries: &[FileSummary]) -> AppResult<String> {
    let details = serde_json::to_string_pretty(summaries)
        .map_err(|e| AppError::json_parse_failed("sort request", e))?;
    Ok(format!(
        "There are {} files.\n\n{}\n\nFile details to sort:\n{}",
        summaries.len(),
        SORT_INSTRUCTIONS,
        details
    ))
}

/// 解析模型回复中的 `sorted_files`，只保留文件名部分
pub fn parse_sorted(reply: &str) -> AppResult<Vec<String>> {
    let value = extract_json(reply)?;
    let names = value["sorted_files"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(s).trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();
    Ok(names)
}

fn leading_number(name: &str) -> Option<u64> {
    let digits: String = name.chars().take_while(char::is_ascii_digit).collect();
    match name[digits.len()..].starts_with('_') {
        true => digits.parse().ok(),
        false => None,
    }
}

/// 兜底顺序：按文件名的数字前缀，没有前缀的按名字排在后面
pub fn fallback_order(summaries: &[FileSummary]) -> Vec<String> {
    let mut names: Vec<&String> = summaries.iter().map(|s| &s.filename).collect();
    names.sort_by(|a, b| {
        let key = |n: &str| (leading_number(n).unwrap_or(u64::MAX), n.to_string());
        key(a).cmp(&key(b))
    });
    names.into_iter().cloned().collect()
}

/// 校验结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedOrder {
    pub files: Vec<String>,
    /// 模型漏掉、被追加到末尾的文件
    pub added: Vec<String>,
    /// 模型给出但文件夹中不存在的条目
    pub unknown: Vec<String>,
}

/// 只保留真实存在的文件（去重），漏掉的按原顺序追加到末尾
pub fn validate_order(sorted: &[String], summaries: &[FileSummary]) -> ValidatedOrder {
    let known: HashSet<&str> = summaries.iter().map(|s| s.filename.as_str()).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut result = ValidatedOrder::default();

    for name in sorted {
        if !known.contains(name.as_str()) {
            result.unknown.push(name.clone());
        } else if seen.insert(name.as_str()) {
            result.files.push(name.clone());
        }
    }
    for s in summaries {
        if !seen.contains(s.filename.as_str()) {
            warn!("⚠️ 模型漏掉了 {}，追加到末尾", s.filename);
            result.added.push(s.filename.clone());
            result.files.push(s.filename.clone());
        }
    }
    result
}

/// 排序结果
#[derive(Debug, Clone)]
pub struct SortOutcome {
    pub order_file: PathBuf,
    pub files: Vec<String>,
    pub added: Vec<String>,
    /// 模型调用或解析失败，使用了前缀顺序
    pub used_fallback: bool,
}

/// 对文件夹排序并写出 `output_name`（位于文件夹内）
pub async fn sort_folder(
    backend: &dyn ChatBackend,
    folder: &Path,
    output_name: &str,
) -> AppResult<SortOutcome> {
    let summaries = collect_summaries(folder)?;
    if summaries.is_empty() {
        return Err(FileError::EmptyDirectory {
            path: folder.display().to_string(),
        }
        .into());
    }
    info!("📁 已读取 {} 个文件的摘要", summaries.len());
    for s in summaries.iter().take(3) {
        info!("  • {}: {} ({} 题)", s.filename, s.disease, s.question_count);
    }

    let request = build_sort_request(&summaries)?;
    info!("🤖 调用 {} 排序...", backend.model_name());
    let answer = match backend.chat(SORT_SYSTEM_PROMPT, &request).await {
        Ok(reply) => parse_sorted(&reply),
        Err(e) => Err(e),
    };
    let (sorted, used_fallback) = match answer {
        Ok(sorted) => (sorted, false),
        Err(e) => {
            warn!("⚠️ 模型排序失败，改为按文件名前缀排序: {}", e);
            (fallback_order(&summaries), true)
        }
    };

    let validated = validate_order(&sorted, &summaries);
    for name in &validated.unknown {
        warn!("⚠️ 模型返回了不存在的文件: {}", name);
    }

    let order_file = folder.join(output_name);
    write_numbered_list(&order_file, &validated.files)?;
    info!("✓ 顺序文件已生成: {} ({} 个文件)", order_file.display(), validated.files.len());

    Ok(SortOutcome {
        order_file,
        files: validated.files,
        added: validated.added,
        used_fallback,
    })
}
