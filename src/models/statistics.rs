use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::repository::Repository;
use crate::error::{Error, Result};

/// Totals derived from a finished repository collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapingStatistics {
    pub total_repositories: u32,
    pub repositories_with_readme: u32,
    pub total_stars: u64,
    pub total_forks: u64,
    /// Distinct languages in the order they were first seen across repositories.
    pub unique_languages: Vec<String>,
    /// Summed bytes per language over all repositories.
    pub language_distribution: BTreeMap<String, u64>,
}

impl ScrapingStatistics {
    pub fn from_repositories(repositories: &[Repository]) -> Self {
        let mut unique_languages = Vec::new();
        let mut language_distribution = BTreeMap::new();

        for repo in repositories {
            for (language, bytes) in &repo.languages {
                if !language_distribution.contains_key(language) {
                    unique_languages.push(language.clone());
                }
                *language_distribution.entry(language.clone()).or_insert(0) += bytes;
            }
        }

        Self {
            total_repositories: repositories.len() as u32,
            repositories_with_readme: repositories.iter().filter(|r| r.has_readme()).count() as u32,
            total_stars: repositories.iter().map(|r| u64::from(r.stars)).sum(),
            total_forks: repositories.iter().map(|r| u64::from(r.forks)).sum(),
            unique_languages,
            language_distribution,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.repositories_with_readme > self.total_repositories {
            return Err(Error::validation(format!(
                "{} repositories with README exceeds total of {}",
                self.repositories_with_readme, self.total_repositories
            )));
        }

        let mut seen = HashSet::new();
        for language in &self.unique_languages {
            if !seen.insert(language.as_str()) {
                return Err(Error::validation(format!(
                    "language {} listed twice in unique_languages",
                    language
                )));
            }
            if !self.language_distribution.contains_key(language) {
                return Err(Error::validation(format!(
                    "language {} missing from language_distribution",
                    language
                )));
            }
        }
        if seen.len() != self.language_distribution.len() {
            return Err(Error::validation(
                "language_distribution has languages not listed in unique_languages",
            ));
        }

        Ok(())
    }

    /// Languages by descending byte count, ties broken by name.
    pub fn top_languages(&self, limit: usize) -> Vec<(&str, u64)> {
        let mut languages: Vec<_> = self
            .language_distribution
            .iter()
            .map(|(name, bytes)| (name.as_str(), *bytes))
            .collect();
        languages.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        languages.truncate(limit);
        languages
    }

    /// Share of total bytes per language, in `top_languages` order.
    pub fn language_percentages(&self) -> Vec<(&str, f64)> {
        let total: u64 = self.language_distribution.values().sum();
        if total == 0 {
            return Vec::new();
        }
        self.top_languages(usize::MAX)
            .into_iter()
            .map(|(name, bytes)| (name, bytes as f64 * 100.0 / total as f64))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(name: &str, stars: u32, forks: u32, languages: &[(&str, u64)]) -> Repository {
        let mut repo = Repository::new(name, format!("https://github.com/u/{}", name)).unwrap();
        repo.stars = stars;
        repo.forks = forks;
        repo.languages = languages.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        repo
    }

    #[test]
    fn test_no_repositories() {
        let stats = ScrapingStatistics::from_repositories(&[]);

        assert_eq!(stats.total_repositories, 0);
        assert_eq!(stats.repositories_with_readme, 0);
        assert_eq!(stats.total_stars, 0);
        assert_eq!(stats.total_forks, 0);
        assert!(stats.unique_languages.is_empty());
        assert!(stats.language_distribution.is_empty());
        assert!(stats.validate().is_ok());
        assert!(stats.language_percentages().is_empty());
    }

    #[test]
    fn test_two_repositories() {
        let repos = vec![
            repo("a", 3, 1, &[("Python", 100)]),
            repo("b", 5, 0, &[("Go", 50), ("Python", 50)]),
        ];
        let stats = ScrapingStatistics::from_repositories(&repos);

        assert_eq!(stats.total_repositories, 2);
        assert_eq!(stats.total_stars, 8);
        assert_eq!(stats.total_forks, 1);
        assert_eq!(stats.unique_languages, vec!["Python", "Go"]);
        assert_eq!(stats.language_distribution.get("Python"), Some(&150));
        assert_eq!(stats.language_distribution.get("Go"), Some(&50));
        assert!(stats.validate().is_ok());
    }

    #[test]
    fn test_readme_count() {
        let mut with_readme = repo("a", 0, 0, &[]);
        with_readme.readme_content = Some("# a".to_string());
        let mut empty_readme = repo("b", 0, 0, &[]);
        empty_readme.readme_content = Some(String::new());

        let stats = ScrapingStatistics::from_repositories(&[with_readme, empty_readme, repo("c", 0, 0, &[])]);
        assert_eq!(stats.repositories_with_readme, 1);
        assert_eq!(stats.total_repositories, 3);
    }

    #[test]
    fn test_top_languages_and_percentages() {
        let repos = vec![
            repo("a", 0, 0, &[("Rust", 300), ("Shell", 100)]),
            repo("b", 0, 0, &[("Go", 100), ("Rust", 300)]),
        ];
        let stats = ScrapingStatistics::from_repositories(&repos);

        assert_eq!(stats.top_languages(2), vec![("Rust", 600), ("Go", 100)]);

        let percentages = stats.language_percentages();
        assert_eq!(percentages.len(), 3);
        assert_eq!(percentages[0].0, "Rust");
        assert!((percentages[0].1 - 75.0).abs() < 1e-9);
        assert_eq!(percentages[2].0, "Shell");
    }

    #[test]
    fn test_validate_rejects_inconsistent_languages() {
        let mut stats = ScrapingStatistics::from_repositories(&[repo("a", 0, 0, &[("Rust", 1)])]);
        stats.unique_languages.push("Rust".to_string());
        assert!(matches!(stats.validate(), Err(Error::Validation(_))));

        let mut stats = ScrapingStatistics::from_repositories(&[repo("a", 0, 0, &[("Rust", 1)])]);
        stats.language_distribution.insert("Go".to_string(), 1);
        assert!(matches!(stats.validate(), Err(Error::Validation(_))));

        let mut stats = ScrapingStatistics::from_repositories(&[]);
        stats.repositories_with_readme = 1;
        assert!(matches!(stats.validate(), Err(Error::Validation(_))));
    }
}
