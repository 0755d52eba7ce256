pub mod fs_utils;
pub mod logging;

pub use fs_utils::{atomic_write, unique_destination, unique_destination_avoiding};
