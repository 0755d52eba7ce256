//! 批量文件处理器 - 编排层
//!
//! 1. **分批处理**：每批最多 `max_concurrent` 个文件，一批完成后再开始下一批
//! 2. **并发控制**：Semaphore + tokio::spawn，`join_all` 收集结果
//! 3. **错误隔离**：单个文件失败只记入统计和警告文件，不影响其他文件

use crate::error::AppResult;
use crate::services::WarnWriter;
use crate::workflow::{FileCtx, FileFlow, ProcessResult};
use futures::future::join_all;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info};

/// 处理统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchStats {
    pub success: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchStats {
    pub fn total(&self) -> usize {
        self.success + self.skipped + self.failed
    }

    fn merge(&mut self, other: BatchStats) {
        self.success += other.success;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

pub struct BatchProcessor {
    max_concurrent: usize,
    warn_writer: Option<Arc<WarnWriter>>,
}

impl BatchProcessor {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
            warn_writer: None,
        }
    }

    /// 失败的文件同时写入警告文件
    pub fn with_warn_writer(mut self, writer: Arc<WarnWriter>) -> Self {
        self.warn_writer = Some(writer);
        self
    }

    /// 对所有文件运行同一个流程
    pub async fn run(&self, flow: Arc<dyn FileFlow>, files: Vec<PathBuf>) -> AppResult<BatchStats> {
        let total = files.len();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut stats = BatchStats::default();
        let total_batches = total.div_ceil(self.max_concurrent);

        for (batch_idx, batch) in files.chunks(self.max_concurrent).enumerate() {
            let batch_start = batch_idx * self.max_concurrent;
            if total_batches > 1 {
                log_batch_start(batch_idx + 1, total_batches, batch_start + 1, batch_start + batch.len(), total);
            }

            let batch_stats = self
                .process_batch(flow.clone(), batch, batch_start, total, semaphore.clone())
                .await?;
            if total_batches > 1 {
                log_batch_complete(batch_idx + 1, &batch_stats);
            }
            stats.merge(batch_stats);
        }

        Ok(stats)
    }

    async fn process_batch(
        &self,
        flow: Arc<dyn FileFlow>,
        batch: &[PathBuf],
        batch_start: usize,
        total: usize,
        semaphore: Arc<Semaphore>,
    ) -> AppResult<BatchStats> {
        let mut handles = Vec::with_capacity(batch.len());

        for (idx, path) in batch.iter().enumerate() {
            let ctx = FileCtx::new(path.clone(), batch_start + idx + 1, total);
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| crate::AppError::Other(format!("并发控制失败: {}", e)))?;
            let flow = flow.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let result = flow.run(&ctx).await;
                (ctx, result)
            });
            handles.push(handle);
        }

        let mut stats = BatchStats::default();
        for joined in join_all(handles).await {
            match joined {
                Ok((_, Ok(ProcessResult::Success))) => stats.success += 1,
                Ok((_, Ok(ProcessResult::Skipped))) => stats.skipped += 1,
                Ok((ctx, Err(e))) => {
                    error!("{} ❌ 处理失败: {}", ctx, e);
                    self.record_warning(flow.name(), &ctx.file_name, &e.to_string());
                    stats.failed += 1;
                }
                Err(e) => {
                    error!("任务执行失败: {}", e);
                    stats.failed += 1;
                }
            }
        }

        Ok(stats)
    }

    fn record_warning(&self, tool: &str, item: &str, reason: &str) {
        if let Some(writer) = &self.warn_writer {
            if let Err(e) = writer.write(tool, item, reason) {
                error!("写入警告文件失败: {}", e);
            }
        }
    }
}

// ========== 日志辅助函数 ==========

fn log_batch_start(batch_num: usize, total_batches: usize, start: usize, end: usize, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 批", batch_num, total_batches);
    info!("📄 本批文件: {}-{} / 共 {} 个", start, end, total);
    info!("{}", "=".repeat(60));
}

fn log_batch_complete(batch_num: usize, stats: &BatchStats) {
    info!("\n{}", "─".repeat(60));
    info!(
        "✓ 第 {} 批完成: 成功 {}/{}",
        batch_num,
        stats.success,
        stats.total()
    );
    info!("{}", "─".repeat(60));
}
