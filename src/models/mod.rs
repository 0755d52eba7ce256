pub mod loaders;
pub mod mcq;
pub mod order;

pub use loaders::{list_json_files, load_mcq_file};
pub use mcq::{Mcq, McqBook, MissingField};
pub use order::OrderList;
