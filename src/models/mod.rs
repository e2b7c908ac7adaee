pub mod api;
pub mod profile;
pub mod repository;
pub mod statistics;
pub mod metadata;
pub mod user_data;

pub use api::*;
pub use profile::*;
pub use repository::*;
pub use statistics::*;
pub use metadata::*;
pub use user_data::*;
