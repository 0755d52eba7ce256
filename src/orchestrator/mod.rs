//! 编排层（Orchestration Layer）
//!
//! 负责批量处理和并发调度，不做具体业务判断。
//!
//! ```text
//! batch_processor (处理 Vec<PathBuf>)
//!     ↓
//! workflow::FileFlow (处理单个文件)
//!     ↓
//! services (能力层：llm / generator / reviewer / warn)
//! ```

pub mod batch_processor;

pub use batch_processor::{BatchProcessor, BatchStats};
