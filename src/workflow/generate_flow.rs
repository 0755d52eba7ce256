//! 题目生成流程 - 流程层
//!
//! 流程顺序：
//! 1. 输出已存在且不允许覆盖 → 跳过
//! 2. 读取原题目文件（作为示例）
//! 3. LLM 生成新题目
//! 4. 解析、校验后原子写入，文件名与原文件一致

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::error::AppResult;
use crate::models::load_mcq_file;
use crate::services::generator::{
    build_generate_request, disease_of, parse_generated, GENERATOR_SYSTEM_PROMPT,
};
use crate::services::ChatBackend;
use crate::utils::atomic_write;
use crate::workflow::{FileCtx, FileFlow, ProcessResult};

pub struct GenerateFlow {
    backend: Arc<dyn ChatBackend>,
    output_dir: PathBuf,
    overwrite: bool,
}

impl GenerateFlow {
    pub fn new(backend: Arc<dyn ChatBackend>, output_dir: PathBuf) -> Self {
        Self {
            backend,
            output_dir,
            overwrite: false,
        }
    }

    pub fn overwrite(mut self, yes: bool) -> Self {
        self.overwrite = yes;
        self
    }
}

#[async_trait]
impl FileFlow for GenerateFlow {
    fn name(&self) -> &'static str {
        "generate"
    }

    async fn run(&self, ctx: &FileCtx) -> AppResult<ProcessResult> {
        let target = self.output_dir.join(&ctx.file_name);
        if target.exists() && !self.overwrite {
            info!("{} ⏭️ 输出已存在，跳过: {}", ctx, target.display());
            return Ok(ProcessResult::Skipped);
        }

        let source = load_mcq_file(&ctx.path)?;
        let disease = disease_of(&source, &ctx.file_name);
        let request = build_generate_request(&source, &ctx.file_name)?;

        info!("{} 🤖 正在生成题目 ({}, 模型 {})", ctx, disease, self.backend.model_name());
        let reply = self.backend.chat(GENERATOR_SYSTEM_PROMPT, &request).await?;

        let generated = parse_generated(&reply, &disease, &ctx.file_name)?;
        let bytes = serde_json::to_vec_pretty(&generated)
            .map_err(|e| crate::AppError::json_parse_failed(&ctx.file_name, e))?;
        atomic_write(&target, &bytes)?;

        info!("{} ✓ 生成 {} 道题 → {}", ctx, generated.mcqs.len(), target.display());
        Ok(ProcessResult::Success)
    }
}
