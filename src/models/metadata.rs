use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const SCRAPER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run-level bookkeeping for one scrape.
///
/// A failed save is recorded here through `save_error` rather than returned as
/// an error; at most one of `saved_to_file` and `save_error` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapingMetadata {
    pub scraped_at: DateTime<Utc>,
    pub scraper_version: String,
    pub total_api_requests: u64,
    #[serde(default)]
    pub saved_to_file: Option<String>,
    #[serde(default)]
    pub save_error: Option<String>,
}

impl ScrapingMetadata {
    pub fn new(scraped_at: DateTime<Utc>, total_api_requests: u64) -> Self {
        Self {
            scraped_at,
            scraper_version: SCRAPER_VERSION.to_string(),
            total_api_requests,
            saved_to_file: None,
            save_error: None,
        }
    }

    pub fn record_saved(&mut self, path: impl Into<String>) {
        self.saved_to_file = Some(path.into());
        self.save_error = None;
    }

    pub fn record_save_error(&mut self, message: impl Into<String>) {
        self.save_error = Some(message.into());
        self.saved_to_file = None;
    }

    pub fn validate(&self) -> Result<()> {
        if self.saved_to_file.is_some() && self.save_error.is_some() {
            return Err(Error::validation(
                "metadata cannot record both a saved file and a save error",
            ));
        }
        if self.scraper_version.trim().is_empty() {
            return Err(Error::validation("scraper_version must not be empty"));
        }
        Ok(())
    }
}
