use crate::error::{Error, Result};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub github_token: Option<String>,
    pub api_url: String,
    pub output_dir: PathBuf,
    pub database_path: String,
    pub include_forks: bool,
    pub concurrency_limit: usize,
    pub requests_per_minute: u32,
    pub save_to_file: bool,
    /// Run log destination; `None` keeps logging on the console only.
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let github_token = env::var("GITHUB_TOKEN").ok().filter(|t| !t.trim().is_empty());

        let api_url = env::var("GITHUB_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "GITHUB_API_URL must be an http(s) URL, got {}",
                api_url
            )));
        }

        let output_dir = env::var("OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("output"));

        let database_path = env::var("DATABASE_PATH")
            .unwrap_or_else(|_| "readmegen.db".to_string());

        let include_forks = env_flag("INCLUDE_FORKS").unwrap_or(true);

        let concurrency_limit = env::var("CONCURRENCY_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&n: &usize| n > 0)
            .unwrap_or(5);

        let requests_per_minute = env::var("REQUESTS_PER_MINUTE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        let save_to_file = env_flag("SAVE_TO_FILE").unwrap_or(true);

        let log_dir = env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());
        let log_file = (!log_dir.trim().is_empty()).then(|| {
            let file_name = env::var("LOG_FILE").unwrap_or_else(|_| "scraper.log".to_string());
            PathBuf::from(log_dir).join(file_name)
        });

        Ok(Self {
            github_token,
            api_url,
            output_dir,
            database_path,
            include_forks,
            concurrency_limit,
            requests_per_minute,
            save_to_file,
            log_file,
        })
    }
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name).ok().map(|v| {
        let v = v.to_lowercase();
        v == "true" || v == "1" || v == "yes"
    })
}

/// Knobs the scrape pipeline reads during a run.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub include_forks: bool,
    pub concurrency_limit: usize,
    /// Upper bound on listed repositories; `None` fetches every page.
    pub max_repositories: Option<u32>,
    pub save_to_file: bool,
    pub show_progress: bool,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            include_forks: true,
            concurrency_limit: 5,
            max_repositories: None,
            save_to_file: true,
            show_progress: false,
        }
    }
}

impl From<&Config> for ScraperConfig {
    fn from(config: &Config) -> Self {
        Self {
            include_forks: config.include_forks,
            concurrency_limit: config.concurrency_limit,
            max_repositories: None,
            save_to_file: config.save_to_file,
            show_progress: true,
        }
    }
}
