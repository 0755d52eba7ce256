//! 题目审阅流程 - 流程层

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::AppResult;
use crate::models::load_mcq_file;
use crate::services::generator::disease_of;
use crate::services::reviewer::{
    build_review_request, finalize_review, review_bytes, review_file_name, REVIEWER_SYSTEM_PROMPT,
};
use crate::services::ChatBackend;
use crate::utils::atomic_write;
use crate::workflow::{FileCtx, FileFlow, ProcessResult};

pub struct ReviewFlow {
    backend: Arc<dyn ChatBackend>,
    output_dir: PathBuf,
}

impl ReviewFlow {
    pub fn new(backend: Arc<dyn ChatBackend>, output_dir: PathBuf) -> Self {
        Self {
            backend,
            output_dir,
        }
    }
}

#[async_trait]
impl FileFlow for ReviewFlow {
    fn name(&self) -> &'static str {
        "review"
    }

    async fn run(&self, ctx: &FileCtx) -> AppResult<ProcessResult> {
        let book = load_mcq_file(&ctx.path)?;
        let disease = disease_of(&book, &ctx.file_name);

        if book.mcqs.is_empty() {
            warn!("{} ⚠️ 文件中没有题目，跳过", ctx);
            return Ok(ProcessResult::Skipped);
        }

        info!(
            "{} 🔍 审阅 {} 道题（字段完整 {} 道）",
            ctx,
            book.mcqs.len(),
            book.valid_count()
        );
        let request = build_review_request(&book, &disease, &ctx.file_name);
        let reply = self.backend.chat(REVIEWER_SYSTEM_PROMPT, &request).await?;

        let review = finalize_review(&reply, &disease, &ctx.file_name);
        let target = self.output_dir.join(review_file_name(&disease));
        atomic_write(&target, &review_bytes(&review)?)?;

        info!("{} ✓ 审阅结果已保存 → {}", ctx, target.display());
        Ok(ProcessResult::Success)
    }
}
