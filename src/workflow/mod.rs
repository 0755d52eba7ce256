//! 流程层（Workflow）
//!
//! 定义"一个题目文件"的完整处理流程：读取 → 调用 LLM → 校验 → 写出。
//! 流程只依赖 `services` 提供的能力，不关心遍历和并发。

pub mod file_ctx;
pub mod generate_flow;
pub mod review_flow;

use crate::error::AppResult;
use async_trait::async_trait;

pub use file_ctx::FileCtx;
pub use generate_flow::GenerateFlow;
pub use review_flow::ReviewFlow;

/// 单个文件的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessResult {
    /// 处理成功
    Success,
    /// 跳过（已存在输出、没有题目等）
    Skipped,
}

/// 针对单个文件的流程
#[async_trait]
pub trait FileFlow: Send + Sync {
    /// 流程名称（日志和警告文件中使用）
    fn name(&self) -> &'static str;

    async fn run(&self, ctx: &FileCtx) -> AppResult<ProcessResult>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::error::{AppError, AppResult};
    use crate::services::ChatBackend;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 固定回复的后端，记录调用次数
    pub struct CannedBackend {
        pub reply: String,
        pub calls: AtomicUsize,
    }

    impl CannedBackend {
        pub fn new(reply: impl Into<String>) -> Self {
            Self {
                reply: reply.into(),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatBackend for CannedBackend {
        async fn chat(&self, _system_message: &str, _user_message: &str) -> AppResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }

        fn model_name(&self) -> &str {
            "canned"
        }
    }

    /// 每次调用都返回不可重试的 API 错误
    pub struct FailingBackend;

    #[async_trait]
    impl ChatBackend for FailingBackend {
        async fn chat(&self, _system_message: &str, _user_message: &str) -> AppResult<String> {
            Err(AppError::llm_api_failed(
                "failing",
                false,
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
            ))
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }
}
