use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::metadata::ScrapingMetadata;
use super::profile::UserProfile;
use super::repository::Repository;
use super::statistics::ScrapingStatistics;
use crate::error::{Error, Result};

/// Everything one scrape produced; the unit handed to downstream consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteUserData {
    pub profile: UserProfile,
    pub repositories: Vec<Repository>,
    pub statistics: ScrapingStatistics,
    pub metadata: ScrapingMetadata,
}

impl CompleteUserData {
    pub fn new(
        profile: UserProfile,
        repositories: Vec<Repository>,
        statistics: ScrapingStatistics,
        metadata: ScrapingMetadata,
    ) -> Result<Self> {
        let data = Self {
            profile,
            repositories,
            statistics,
            metadata,
        };
        data.validate()?;
        Ok(data)
    }

    pub fn from_parts(
        profile: UserProfile,
        repositories: Vec<Repository>,
        metadata: ScrapingMetadata,
    ) -> Result<Self> {
        let statistics = ScrapingStatistics::from_repositories(&repositories);
        Self::new(profile, repositories, statistics, metadata)
    }

    pub fn validate(&self) -> Result<()> {
        self.profile.validate()?;
        self.metadata.validate()?;
        self.statistics.validate()?;

        let mut seen = HashSet::new();
        for repo in &self.repositories {
            repo.validate()?;
            if !seen.insert((repo.name.as_str(), repo.url.as_str())) {
                return Err(Error::validation(format!(
                    "repository {} ({}) appears more than once",
                    repo.name, repo.url
                )));
            }
        }

        let expected = ScrapingStatistics::from_repositories(&self.repositories);
        let stats = &self.statistics;
        if stats.total_repositories != expected.total_repositories
            || stats.repositories_with_readme != expected.repositories_with_readme
            || stats.total_stars != expected.total_stars
            || stats.total_forks != expected.total_forks
            || stats.language_distribution != expected.language_distribution
        {
            return Err(Error::validation(format!(
                "statistics for {} do not match its {} repositories",
                self.profile.login,
                self.repositories.len()
            )));
        }

        Ok(())
    }
}
