use crate::assembler::AnswerPlacement;
use crate::error::{AppResult, ConfigError};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "mcq_tools.toml";

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 题目 JSON 文件所在目录
    pub mcq_folder: String,
    /// 主排序文件
    pub order_file: String,
    /// 输出文档的文件名（不含扩展名）
    pub output_stem: String,
    // --- 书籍信息 ---
    pub book_title: String,
    pub book_author: String,
    pub book_year: String,
    /// 答案位置：immediate / chapter_end / book_end
    pub answer_placement: AnswerPlacement,
    /// 章节标题下是否显示来源文件
    pub show_chapter_source: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 同时发出的 LLM 请求数
    pub max_concurrent_requests: usize,
    /// 单个文件的最大重试次数
    pub llm_max_retries: u32,
    /// 生成题目的输出目录（相对于 mcq_folder）
    pub generated_folder: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mcq_folder: "mcq_json".to_string(),
            order_file: "order.txt".to_string(),
            output_stem: "MCQ_Book".to_string(),
            book_title: "MCQ Book".to_string(),
            book_author: String::new(),
            book_year: chrono::Local::now().format("%Y").to_string(),
            answer_placement: AnswerPlacement::Immediate,
            show_chapter_source: false,
            verbose_logging: false,
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.deepseek.com/v1".to_string(),
            llm_model_name: "deepseek-chat".to_string(),
            max_concurrent_requests: 1,
            llm_max_retries: 3,
            generated_folder: "generated".to_string(),
        }
    }
}

impl Config {
    /// 加载配置：默认值 → 配置文件（可选）→ 环境变量
    pub fn load() -> AppResult<Self> {
        Self::load_from(None)
    }

    /// 同 [`Config::load`]，但可以显式指定配置文件（必须存在）
    pub fn load_from(explicit: Option<&Path>) -> AppResult<Self> {
        let path = match explicit {
            Some(p) if !p.exists() => {
                return Err(crate::error::FileError::NotFound {
                    path: p.display().to_string(),
                }
                .into())
            }
            Some(p) => p.to_path_buf(),
            None => std::env::var("MCQ_TOOLS_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE)),
        };

        let base = if path.exists() {
            Self::from_toml_file(&path)?
        } else {
            Self::default()
        };

        base.overlay_env(|name| std::env::var(name).ok())
    }

    /// 从 TOML 文件读取，缺失的字段使用默认值
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::AppError::file_read_failed(path.display().to_string(), e))?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    pub fn from_toml_str(content: &str, origin: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|source| {
            ConfigError::ParseFailed {
                path: origin.to_string(),
                source,
            }
            .into()
        })
    }

    /// 用环境变量覆盖已有配置
    ///
    /// `lookup` 便于测试时替换真实环境。
    pub fn overlay_env<F>(self, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse_bool = |name: &str, current: bool| -> AppResult<bool> {
            match lookup(name) {
                Some(v) => v.parse().map_err(|_| {
                    ConfigError::EnvVarParseFailed {
                        var_name: name.to_string(),
                        value: v,
                        expected_type: "bool".to_string(),
                    }
                    .into()
                }),
                None => Ok(current),
            }
        };
        let parse_num = |name: &str, current: usize| -> AppResult<usize> {
            match lookup(name) {
                Some(v) => v.parse().map_err(|_| {
                    ConfigError::EnvVarParseFailed {
                        var_name: name.to_string(),
                        value: v,
                        expected_type: "usize".to_string(),
                    }
                    .into()
                }),
                None => Ok(current),
            }
        };

        let api_key = lookup("LLM_API_KEY")
            .or_else(|| lookup("DEEPSEEK_API_KEY"))
            .or_else(|| lookup("OPENAI_API_KEY"))
            .unwrap_or(self.llm_api_key);

        let answer_placement = match lookup("ANSWER_PLACEMENT") {
            Some(v) => v.parse().map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: "ANSWER_PLACEMENT".to_string(),
                value: v,
                expected_type: "immediate | chapter_end | book_end".to_string(),
            })?,
            None => self.answer_placement,
        };

        Ok(Self {
            mcq_folder: lookup("MCQ_FOLDER").unwrap_or(self.mcq_folder),
            order_file: lookup("ORDER_FILE").unwrap_or(self.order_file),
            output_stem: lookup("OUTPUT_STEM").unwrap_or(self.output_stem),
            book_title: lookup("BOOK_TITLE").unwrap_or(self.book_title),
            book_author: lookup("BOOK_AUTHOR").unwrap_or(self.book_author),
            book_year: lookup("BOOK_YEAR").unwrap_or(self.book_year),
            answer_placement,
            show_chapter_source: parse_bool("SHOW_CHAPTER_SOURCE", self.show_chapter_source)?,
            verbose_logging: parse_bool("VERBOSE_LOGGING", self.verbose_logging)?,
            llm_api_key: api_key,
            llm_api_base_url: lookup("LLM_API_BASE_URL").unwrap_or(self.llm_api_base_url),
            llm_model_name: lookup("LLM_MODEL_NAME").unwrap_or(self.llm_model_name),
            max_concurrent_requests: parse_num(
                "MAX_CONCURRENT_REQUESTS",
                self.max_concurrent_requests,
            )?
            .max(1),
            llm_max_retries: parse_num("LLM_MAX_RETRIES", self.llm_max_retries as usize)? as u32,
            generated_folder: lookup("GENERATED_FOLDER").unwrap_or(self.generated_folder),
        })
    }

    /// LLM 相关命令启动前的检查
    pub fn require_api_key(&self) -> AppResult<&str> {
        if self.llm_api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey.into());
        }
        Ok(&self.llm_api_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_has_no_embedded_key() {
        let config = Config::default();
        assert!(config.llm_api_key.is_empty());
        assert!(config.require_api_key().is_err());
    }

    #[test]
    fn test_env_overrides_and_key_fallback() {
        let config = Config::default()
            .overlay_env(env(&[
                ("DEEPSEEK_API_KEY", "sk-test"),
                ("MCQ_FOLDER", "questions"),
                ("MAX_CONCURRENT_REQUESTS", "0"),
                ("ANSWER_PLACEMENT", "book_end"),
            ]))
            .unwrap();

        assert_eq!(config.require_api_key().unwrap(), "sk-test");
        assert_eq!(config.mcq_folder, "questions");
        assert_eq!(config.max_concurrent_requests, 1);
        assert_eq!(config.answer_placement, AnswerPlacement::BookEnd);
    }

    #[test]
    fn test_bad_env_value_is_reported() {
        let err = Config::default()
            .overlay_env(env(&[("VERBOSE_LOGGING", "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains("VERBOSE_LOGGING"));
    }

    #[test]
    fn test_toml_partial_file() {
        let config = Config::from_toml_str(
            r#"
book_title = "Pediatric Surgery MCQ Book"
answer_placement = "chapter_end"
"#,
            "inline",
        )
        .unwrap();
        assert_eq!(config.book_title, "Pediatric Surgery MCQ Book");
        assert_eq!(config.answer_placement, AnswerPlacement::ChapterEnd);
        assert_eq!(config.order_file, "order.txt");
    }
}
