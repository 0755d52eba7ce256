//! 题目生成服务 - 业务能力层
//!
//! 只负责"拼提示词 / 解析回复"，不关心文件遍历和并发

use crate::error::{AppResult, DataError};
use crate::models::{McqBook, MissingField};
use crate::services::llm_service::extract_json;
use crate::services::normalizer::strip_numeric_prefix;
use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;

/// 生成题目使用的系统提示词
pub const GENERATOR_SYSTEM_PROMPT: &str = r#"You are an expert medical educator who writes high-quality multiple-choice questions.
You will receive a JSON object with an existing set of MCQs for one disease.
Write a NEW set of MCQs on the same disease. Do not repeat or paraphrase the existing questions.

Rules:
- Produce the same number of questions as the input (at least 5).
- Each question has exactly four options labelled "A" to "D" and one correct answer.
- The explanation is 1-2 sentences.

Return ONLY a single JSON object (no markdown, no commentary) in this exact schema:
{
  "disease": "Disease Name",
  "mcqs": [
    {
      "question": "Question text",
      "options": {"A": "Option A", "B": "Option B", "C": "Option C", "D": "Option D"},
      "correct_answer": "A",
      "explanation": "Explanation text"
    }
  ]
}"#;

fn mcq_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^[\w\-]+_mcqs\.json$").expect("static regex"))
}

/// 文件名是否符合 `<disease>_mcqs.json` 约定（允许数字前缀）
pub fn is_mcq_file(file_name: &str) -> bool {
    mcq_name_regex().is_match(strip_numeric_prefix(file_name))
}

/// 疾病名：优先用文件中的 disease 字段，否则从文件名推断
pub fn disease_of(book: &McqBook, file_name: &str) -> String {
    if let Some(d) = book.disease.as_deref().filter(|d| !d.trim().is_empty()) {
        return d.trim().to_string();
    }
    let stem = strip_numeric_prefix(file_name);
    let stem = stem
        .strip_suffix(".json")
        .or_else(|| stem.strip_suffix(".JSON"))
        .unwrap_or(stem);
    stem.trim_end_matches("_mcqs").replace('_', " ")
}

/// 生成请求的用户消息：把现有题目作为示例发给模型
pub fn build_generate_request(book: &McqBook, file_name: &str) -> AppResult<String> {
    let payload = serde_json::json!({
        "disease": disease_of(book, file_name),
        "source_filename": file_name,
        "question_count": book.mcqs.len().max(5),
        "mcqs": book.mcqs,
    });
    serde_json::to_string_pretty(&payload)
        .map_err(|e| crate::AppError::json_parse_failed(file_name, e))
}

/// 解析模型回复为题目文件，丢弃不完整的题目
///
/// 没有一道完整题目时返回 `DataError::NoValidMcqs`。
pub fn parse_generated(reply: &str, disease: &str, file_name: &str) -> AppResult<McqBook> {
    let value = extract_json(reply)?;
    let mut book: McqBook = serde_json::from_value(value)
        .map_err(|e| crate::AppError::json_parse_failed(file_name, e))?;

    let before = book.mcqs.len();
    book.mcqs.retain(|q| match q.validate() {
        Ok(()) => true,
        Err(field) => {
            log_dropped(file_name, field);
            false
        }
    });
    if book.mcqs.len() < before {
        warn!(
            "[{}] 丢弃了 {} 道不完整的生成题目",
            file_name,
            before - book.mcqs.len()
        );
    }

    if book.mcqs.is_empty() {
        return Err(DataError::NoValidMcqs {
            path: file_name.to_string(),
        }
        .into());
    }
    if book.disease.is_none() {
        book.disease = Some(disease.to_string());
    }
    Ok(book)
}

fn log_dropped(file_name: &str, field: MissingField) {
    tracing::debug!("[{}] 生成的题目缺少字段 {}", file_name, field);
}
