pub mod ai_sorter;
pub mod comparator;
pub mod flattener;
pub mod generator;
pub mod llm_service;
pub mod name_checker;
pub mod normalizer;
pub mod order_session;
pub mod ordering;
pub mod reviewer;
pub mod scanner;
pub mod warn_writer;

pub use llm_service::{ChatBackend, LlmService};
pub use order_session::OrderSession;
pub use warn_writer::WarnWriter;
