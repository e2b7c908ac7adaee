use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::api::{default_branch, ApiRepository};
use crate::error::{Error, Result};

/// Language name to byte count, as reported by `/repos/{owner}/{repo}/languages`.
pub type LanguageBytes = BTreeMap<String, u64>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub about: Option<String>,
    pub description: Option<String>,
    pub readme_content: Option<String>,
    pub languages: LanguageBytes,
    pub url: String,
    pub stars: u32,
    pub forks: u32,
    pub is_fork: bool,
    pub default_branch: String,
}

impl Repository {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Result<Self> {
        let repo = Self {
            name: name.into(),
            about: None,
            description: None,
            readme_content: None,
            languages: LanguageBytes::new(),
            url: url.into(),
            stars: 0,
            forks: 0,
            is_fork: false,
            default_branch: default_branch(),
        };
        repo.validate()?;
        Ok(repo)
    }

    /// GitHub only exposes one `description`; it is what the "About" box shows,
    /// so it fills both `about` and `description`.
    pub fn from_api(
        repo: ApiRepository,
        readme_content: Option<String>,
        languages: LanguageBytes,
    ) -> Result<Self> {
        let repo = Self {
            name: repo.name,
            about: repo.description.clone(),
            description: repo.description,
            readme_content,
            languages,
            url: repo.html_url,
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            is_fork: repo.fork,
            default_branch: repo.default_branch,
        };
        repo.validate()?;
        Ok(repo)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("repository name must not be empty"));
        }
        if self.url.trim().is_empty() {
            return Err(Error::validation(format!(
                "repository {} has an empty url",
                self.name
            )));
        }
        Ok(())
    }

    pub fn has_readme(&self) -> bool {
        self.readme_content
            .as_deref()
            .is_some_and(|content| !content.is_empty())
    }

    /// Language with the most bytes; ties go to the alphabetically first name.
    pub fn primary_language(&self) -> Option<&str> {
        self.languages
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(name, _)| name.as_str())
    }
}
