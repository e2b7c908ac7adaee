pub mod config;
pub mod error;
pub mod models;
pub mod github;
pub mod logging;
pub mod scraper;
pub mod storage;

pub use config::{Config, ScraperConfig};
pub use error::{Error, Result};
pub use github::{GitHubClient, ProfileSource, RateLimiter};
pub use models::{CompleteUserData, Repository, ScrapingMetadata, ScrapingStatistics, UserProfile};
pub use scraper::ScrapePipeline;
pub use storage::{JsonStore, Storage};
