pub mod json_loader;

pub use json_loader::{list_json_files, load_mcq_file};
