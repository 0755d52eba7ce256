//! # MCQ Book Tools
//!
//! 整理选择题 JSON 文件并组装成书的一组工具
//!
//! ## 架构设计
//!
//! ### ① 数据层（Models）
//! - `models/` - 题目文件（`McqBook`）、排序列表（`OrderList`）及加载器
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，每个模块只做一件事
//! - 扫描、编号、比对、展平、排序会话、AI 教材排序、文件名检查
//! - `LlmService` - LLM 调用能力（`ChatBackend`）
//! - `WarnWriter` - 写 warn.txt 能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个文件"的完整处理流程
//! - `FileCtx` - 上下文封装（文件 + 序号）
//! - `GenerateFlow` / `ReviewFlow` - 读取 → LLM → 校验 → 写出
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量处理，控制并发
//!
//! ### ⑤ 组装层（Assembler）
//! - `assembler/` - 按顺序文件组装书籍，输出 Markdown / DOCX
//!
//! `cli/` 只负责解析参数并分发到以上各层。

pub mod assembler;
pub mod cli;
pub mod config;
pub mod error;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{Mcq, McqBook, OrderList};
pub use orchestrator::{BatchProcessor, BatchStats};
pub use workflow::{FileCtx, FileFlow, ProcessResult};
