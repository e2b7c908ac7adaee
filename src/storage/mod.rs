pub mod json;
pub mod sqlite;

pub use json::JsonStore;
pub use sqlite::{SnapshotSummary, Storage};
