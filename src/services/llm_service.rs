//! LLM 服务 - 业务能力层
//!
//! 只负责"调用 LLM"能力，不关心流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 DeepSeek 等）

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, LlmError};

/// 对话能力
///
/// 流程层只依赖这个 trait，测试时可以换成固定回复的实现。
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// 发送一轮对话，返回模型的文本回复
    async fn chat(&self, system_message: &str, user_message: &str) -> AppResult<String>;

    /// 模型名称（用于日志和错误信息）
    fn model_name(&self) -> &str;
}

/// LLM 服务
///
/// 职责：
/// - 调用兼容 OpenAI 的 Chat Completion API
/// - 对网络/服务端错误做有限次数的重试
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
    temperature: f32,
    max_retries: u32,
}

impl LlmService {
    /// 创建新的 LLM 服务，未配置 API Key 时返回错误
    pub fn new(config: &Config) -> AppResult<Self> {
        let api_key = config.require_api_key()?;

        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(&config.llm_api_base_url);

        Ok(Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
            temperature: 0.3,
            max_retries: config.llm_max_retries,
        })
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// 单次调用，不重试
    async fn send_once(&self, system_message: &str, user_message: &str) -> AppResult<String> {
        let build_err = |e: OpenAIError| {
            AppError::Llm(LlmError::RequestBuildFailed(e.to_string()))
        };

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(system_message)
            .build()
            .map_err(build_err)?;
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map_err(build_err)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![
                ChatCompletionRequestMessage::System(system_msg),
                ChatCompletionRequestMessage::User(user_msg),
            ])
            .temperature(self.temperature)
            .build()
            .map_err(build_err)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| {
                let transient = is_transient(&e);
                AppError::llm_api_failed(&self.model_name, transient, e)
            })?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| LlmError::EmptyContent {
                model: self.model_name.clone(),
            })?;

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl ChatBackend for LlmService {
    async fn chat(&self, system_message: &str, user_message: &str) -> AppResult<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());

        let mut attempt = 0;
        loop {
            match self.send_once(system_message, user_message).await {
                Ok(content) => {
                    debug!("LLM API 调用成功");
                    return Ok(content);
                }
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = backoff_delay(attempt);
                    warn!(
                        "LLM 调用失败，第 {}/{} 次重试，等待 {:.1}s: {}",
                        attempt,
                        self.max_retries,
                        delay.as_secs_f32(),
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// 网络错误、限流和服务端错误可以重试；鉴权失败、参数错误等直接返回
fn is_transient(err: &OpenAIError) -> bool {
    match err {
        OpenAIError::Reqwest(_) => true,
        OpenAIError::ApiError(api) => {
            is_transient_api_error(api.r#type.as_deref(), api.code.as_deref())
        }
        _ => false,
    }
}

/// 按 API 返回的 `type` / `code` 判断
fn is_transient_api_error(kind: Option<&str>, code: Option<&str>) -> bool {
    const TRANSIENT: &[&str] = &[
        "rate_limit_exceeded",
        "rate_limit_error",
        "server_error",
        "service_unavailable",
        "overloaded_error",
        "timeout",
    ];
    [kind, code]
        .into_iter()
        .flatten()
        .any(|v| TRANSIENT.contains(&v))
}

/// 第 n 次重试前的等待时间：1.5^n 秒
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs_f64(1.5_f64.powi(attempt as i32))
}

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").expect("static regex"))
}

/// 从模型回复中取出 JSON 对象
///
/// 模型经常会在 JSON 外面包一层 markdown 代码块或加几句说明，
/// 这里先去掉代码块，再截取最外层的 `{ ... }`。
pub fn extract_json(reply: &str) -> AppResult<serde_json::Value> {
    let body = fence_regex()
        .captures(reply)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(reply);

    let invalid = || {
        AppError::Llm(LlmError::InvalidJson {
            snippet: crate::utils::logging::truncate_text(reply, 120),
        })
    };

    let start = body.find('{').ok_or_else(invalid)?;
    let end = body.rfind('}').ok_or_else(invalid)?;
    if end < start {
        return Err(invalid());
    }

    serde_json::from_str(&body[start..=end]).map_err(|_| invalid())
}
