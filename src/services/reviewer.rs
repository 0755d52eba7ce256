//! 题目审阅服务 - 业务能力层
//!
//! 让模型检查一个题目文件的准确性、语法和题目质量，
//! 审阅结果原样保存为 JSON。

use crate::error::AppResult;
use crate::models::McqBook;
use crate::services::llm_service::extract_json;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::OnceLock;
use tracing::warn;

pub const REVIEWER_SYSTEM_PROMPT: &str = r#"You are an expert pediatric surgery reviewer. You will receive a JSON object containing MCQs for one disease, in this format:
{"disease": "...", "source_filename": "...", "mcqs": [{"question": "...", "options": {"A": "..."}, "correct_answer": "A", "explanation": "..."}]}

Perform the following tasks and return only a single JSON object (no extra text):
1. Accuracy check: verify factual correctness of each question and answer; for any error give a concise correction.
2. Spelling and grammar: detect mistakes in questions, options and explanations and give the corrected text.
3. Quality assessment: rate overall quality 1-5 and list issues (ambiguous stems, cueing, poor distractors, outdated terminology).
4. Suggestions: actionable edits; if a question should be removed, explain why.
5. Improved examples: up to 5 rewritten questions, prioritising those with issues.
6. Confidence: overall confidence 0-1.

Response schema:
{
  "disease": "string",
  "source_filename": "string",
  "accuracy_summary": {"overall_accuracy": "high|moderate|low", "factual_errors": [{"mcq_id": "", "issue": "", "correction": ""}]},
  "spelling_grammar": [{"mcq_id": "", "field": "question|option|explanation", "original": "", "corrected": ""}],
  "quality": {"score": 1, "issues": [""]},
  "suggestions": [""],
  "improved_examples": [{"mcq_id": "", "question": "", "options": [""], "correct_option": "", "explanation": ""}],
  "confidence": 0.0
}"#;

/// 审阅请求的用户消息
pub fn build_review_request(book: &McqBook, disease: &str, file_name: &str) -> String {
    json!({
        "disease": disease,
        "source_filename": file_name,
        "mcqs": book.mcqs,
    })
    .to_string()
}

/// 整理模型回复
///
/// 能解析成 JSON 对象时补齐 disease / source_filename；
/// 否则把原始回复包进 `raw_response`，不丢弃任何内容。
pub fn finalize_review(reply: &str, disease: &str, file_name: &str) -> Value {
    match extract_json(reply) {
        Ok(Value::Object(mut map)) => {
            map.entry("disease").or_insert_with(|| json!(disease));
            map.entry("source_filename").or_insert_with(|| json!(file_name));
            Value::Object(map)
        }
        _ => {
            warn!("[{}] 审阅结果不是有效的 JSON，保存原始回复", file_name);
            json!({
                "disease": disease,
                "source_filename": file_name,
                "raw_response": reply,
            })
        }
    }
}

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\-. ]").expect("static regex"))
}

/// 生成安全的文件名片段（最多 200 个字符）
pub fn safe_filename(name: &str) -> String {
    let replaced = unsafe_chars().replace_all(name, "_");
    replaced
        .trim()
        .replace(' ', "_")
        .chars()
        .take(200)
        .collect()
}

/// 审阅结果文件名：`review_<disease>.json`
pub fn review_file_name(disease: &str) -> String {
    format!("review_{}.json", safe_filename(disease))
}

/// 序列化审阅结果（缩进两格，保留非 ASCII 字符）
pub fn review_bytes(review: &Value) -> AppResult<Vec<u8>> {
    serde_json::to_vec_pretty(review).map_err(|e| crate::AppError::json_parse_failed("review", e))
}
