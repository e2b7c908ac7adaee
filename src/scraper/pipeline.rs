use std::collections::HashSet;
use std::sync::Arc;
use chrono::Utc;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;

use crate::config::ScraperConfig;
use crate::error::Result;
use crate::github::ProfileSource;
use crate::models::{
    ApiRepository, CompleteUserData, LanguageBytes, Repository, ScrapingMetadata,
    ScrapingStatistics, UserProfile,
};
use crate::storage::JsonStore;

/// Runs one complete scrape: profile, repositories, statistics, metadata, and
/// optionally a JSON save whose outcome lands in the metadata.
pub struct ScrapePipeline {
    source: Arc<dyn ProfileSource>,
    store: Option<JsonStore>,
    config: ScraperConfig,
}

impl ScrapePipeline {
    pub fn new(
        source: impl ProfileSource + 'static,
        store: Option<JsonStore>,
        config: ScraperConfig,
    ) -> Self {
        Self {
            source: Arc::new(source),
            store,
            config,
        }
    }

    pub async fn scrape_user(&self, username: &str) -> Result<CompleteUserData> {
        tracing::info!("Starting complete scrape for user: {}", username);
        let scraped_at = Utc::now();
        let requests_before = self.source.api_requests();

        let profile = self.fetch_profile(username).await?;

        // With forks excluded the cap applies to what survives the filter
        let listing_cap = if self.config.include_forks {
            self.config.max_repositories
        } else {
            None
        };
        let repos = self
            .source
            .fetch_repositories(&profile.login, listing_cap)
            .await?;

        let mut seen = HashSet::new();
        let mut repos: Vec<_> = repos
            .into_iter()
            .filter(|r| self.config.include_forks || !r.fork)
            .filter(|r| {
                let first = seen.insert((r.name.clone(), r.html_url.clone()));
                if !first {
                    tracing::debug!("Skipping repeated listing entry: {}", r.name);
                }
                first
            })
            .collect();
        if let Some(max) = self.config.max_repositories {
            repos.truncate(max as usize);
        }
        tracing::info!("Found {} repositories to process", repos.len());

        let repositories = self.fetch_repository_details(repos).await?;
        let statistics = ScrapingStatistics::from_repositories(&repositories);

        let total_api_requests = self.source.api_requests().saturating_sub(requests_before);
        let metadata = ScrapingMetadata::new(scraped_at, total_api_requests);

        let mut data = CompleteUserData::new(profile, repositories, statistics, metadata)?;

        if self.config.save_to_file {
            let login = data.profile.login.clone();
            self.save(&mut data, &login);
        }

        let stats = &data.statistics;
        tracing::info!("Complete scrape finished for: {}", username);
        tracing::info!(
            "Summary: {} repos, {} with README, {} languages, {} total stars",
            stats.total_repositories,
            stats.repositories_with_readme,
            stats.unique_languages.len(),
            stats.total_stars
        );

        Ok(data)
    }

    async fn fetch_profile(&self, username: &str) -> Result<UserProfile> {
        tracing::info!("Fetching profile information for user: {}", username);
        let user = self.source.fetch_user(username).await?;

        let profile_readme = match self.source.fetch_readme(&user.login, &user.login).await {
            Ok(readme) => readme,
            Err(e) => {
                tracing::warn!("Profile README lookup failed for {}: {}", user.login, e);
                None
            }
        };
        if profile_readme.is_some() {
            tracing::info!("Found profile README for user: {}", user.login);
        }

        UserProfile::from_api(user, profile_readme)
    }

    /// README and languages per repository, fetched concurrently. Output keeps
    /// the listing order.
    async fn fetch_repository_details(&self, repos: Vec<ApiRepository>) -> Result<Vec<Repository>> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency_limit.max(1)));
        let pb = self.progress_bar(repos.len() as u64);

        let futures = repos.into_iter().map(|repo| {
            let source = self.source.clone();
            let sem = semaphore.clone();
            let pb = pb.clone();

            async move {
                let _permit = sem.acquire_owned().await.ok();
                let owner = repo.owner.login.clone();
                tracing::debug!("Processing repository: {}", repo.name);

                let readme = match source.fetch_readme(&owner, &repo.name).await {
                    Ok(readme) => readme,
                    Err(e) => {
                        tracing::warn!("README lookup failed for {}/{}: {}", owner, repo.name, e);
                        None
                    }
                };
                let languages = match source.fetch_languages(&owner, &repo.name).await {
                    Ok(languages) => languages,
                    Err(e) => {
                        tracing::warn!("Languages lookup failed for {}/{}: {}", owner, repo.name, e);
                        LanguageBytes::new()
                    }
                };

                pb.inc(1);
                Repository::from_api(repo, readme, languages)
            }
        });

        let results = join_all(futures).await;
        pb.finish_with_message("Fetched all repositories");

        results.into_iter().collect()
    }

    fn save(&self, data: &mut CompleteUserData, username: &str) {
        let Some(store) = &self.store else {
            data.metadata.record_save_error("no output directory configured");
            tracing::warn!("Save requested for {} but no output directory is configured", username);
            return;
        };

        match store.save(data, username) {
            Ok(path) => {
                tracing::info!("Results saved to: {}", path.display());
                data.metadata.record_saved(path.display().to_string());
            }
            Err(e) => {
                tracing::error!("Failed to save results to file: {}", e);
                data.metadata.record_save_error(e.to_string());
            }
        }
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} repos")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::ApiUser;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeSource {
        users: HashMap<String, ApiUser>,
        repos: Vec<ApiRepository>,
        readmes: HashMap<String, String>,
        languages: HashMap<String, LanguageBytes>,
        requests: AtomicU64,
    }

    impl FakeSource {
        fn count(&self) {
            self.requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[async_trait]
    impl ProfileSource for FakeSource {
        async fn fetch_user(&self, username: &str) -> Result<ApiUser> {
            self.count();
            self.users
                .get(&username.to_lowercase())
                .cloned()
                .ok_or_else(|| Error::UserNotFound(username.to_string()))
        }

        async fn fetch_repositories(
            &self,
            _username: &str,
            max_repos: Option<u32>,
        ) -> Result<Vec<ApiRepository>> {
            self.count();
            let mut repos = self.repos.clone();
            if let Some(max) = max_repos {
                repos.truncate(max as usize);
            }
            Ok(repos)
        }

        async fn fetch_languages(&self, _owner: &str, repo: &str) -> Result<LanguageBytes> {
            self.count();
            if repo == "broken" {
                return Err(Error::GitHubApi("boom".to_string()));
            }
            Ok(self.languages.get(repo).cloned().unwrap_or_default())
        }

        async fn fetch_readme(&self, _owner: &str, repo: &str) -> Result<Option<String>> {
            self.count();
            Ok(self.readmes.get(repo).cloned())
        }

        fn api_requests(&self) -> u64 {
            self.requests.load(Ordering::Relaxed)
        }
    }

    fn api_repo(name: &str, stars: u32, forks: u32, fork: bool) -> ApiRepository {
        serde_json::from_value(serde_json::json!({
            "name": name,
            "description": format!("{} description", name),
            "html_url": format!("https://github.com/octocat/{}", name),
            "stargazers_count": stars,
            "forks_count": forks,
            "fork": fork,
            "default_branch": "main",
            "owner": { "login": "octocat" }
        }))
        .unwrap()
    }

    fn fake_source() -> FakeSource {
        let user: ApiUser = serde_json::from_value(serde_json::json!({
            "login": "octocat",
            "name": "The Octocat",
            "public_repos": 3,
            "followers": 20,
            "following": 1,
            "twitter_username": null
        }))
        .unwrap();

        let mut source = FakeSource::default();
        source.users.insert("octocat".to_string(), user);
        source.repos = vec![
            api_repo("a", 3, 1, false),
            api_repo("b", 5, 0, false),
            api_repo("forked", 1, 0, true),
        ];
        source.readmes.insert("octocat".to_string(), "# Hi there".to_string());
        source.readmes.insert("a".to_string(), "# a".to_string());
        source.languages.insert(
            "a".to_string(),
            [("Python".to_string(), 100)].into_iter().collect(),
        );
        source.languages.insert(
            "b".to_string(),
            [("Go".to_string(), 50), ("Python".to_string(), 50)].into_iter().collect(),
        );
        source
    }

    fn config(include_forks: bool) -> ScraperConfig {
        ScraperConfig {
            include_forks,
            save_to_file: false,
            ..ScraperConfig::default()
        }
    }

    #[tokio::test]
    async fn test_scrape_builds_consistent_data() {
        let pipeline = ScrapePipeline::new(fake_source(), None, config(false));
        let data = pipeline.scrape_user("octocat").await.unwrap();

        assert_eq!(data.profile.login, "octocat");
        assert_eq!(data.profile.profile_readme.as_deref(), Some("# Hi there"));

        let names: Vec<_> = data.repositories.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);

        assert_eq!(data.statistics.total_stars, 8);
        assert_eq!(data.statistics.total_forks, 1);
        assert_eq!(data.statistics.repositories_with_readme, 1);
        assert_eq!(data.statistics.unique_languages, vec!["Python", "Go"]);

        // user + profile readme + repo list + (readme + languages) per repo
        assert_eq!(data.metadata.total_api_requests, 7);
        assert!(data.metadata.saved_to_file.is_none());
        assert!(data.metadata.save_error.is_none());
    }

    #[tokio::test]
    async fn test_forks_included_when_configured() {
        let pipeline = ScrapePipeline::new(fake_source(), None, config(true));
        let data = pipeline.scrape_user("octocat").await.unwrap();

        assert_eq!(data.statistics.total_repositories, 3);
        assert!(data.repositories[2].is_fork);
    }

    #[tokio::test]
    async fn test_failed_language_lookup_is_absent_not_fatal() {
        let mut source = fake_source();
        source.repos.push(api_repo("broken", 0, 0, false));
        let pipeline = ScrapePipeline::new(source, None, config(false));

        let data = pipeline.scrape_user("octocat").await.unwrap();
        let broken = data.repositories.iter().find(|r| r.name == "broken").unwrap();
        assert!(broken.languages.is_empty());
    }

    #[tokio::test]
    async fn test_repeated_listing_entries_are_dropped() {
        let mut source = fake_source();
        source.repos = vec![
            api_repo("a", 3, 1, false),
            api_repo("b", 5, 0, false),
            api_repo("a", 3, 1, false),
        ];
        let pipeline = ScrapePipeline::new(source, None, config(false));

        let data = pipeline.scrape_user("octocat").await.unwrap();
        let names: Vec<_> = data.repositories.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(data.statistics.total_stars, 8);
    }

    #[tokio::test]
    async fn test_repository_cap_counts_after_fork_filter() {
        let mut source = fake_source();
        source.repos = vec![
            api_repo("forked", 1, 0, true),
            api_repo("a", 3, 1, false),
            api_repo("b", 5, 0, false),
            api_repo("c", 0, 0, false),
        ];
        let pipeline = ScrapePipeline::new(
            source,
            None,
            ScraperConfig {
                max_repositories: Some(2),
                ..config(false)
            },
        );

        let data = pipeline.scrape_user("octocat").await.unwrap();
        let names: Vec<_> = data.repositories.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_repository_cap_with_forks_included() {
        let pipeline = ScrapePipeline::new(
            fake_source(),
            None,
            ScraperConfig {
                max_repositories: Some(1),
                ..config(true)
            },
        );

        let data = pipeline.scrape_user("octocat").await.unwrap();
        assert_eq!(data.repositories.len(), 1);
        assert_eq!(data.repositories[0].name, "a");
    }

    #[tokio::test]
    async fn test_unknown_user_fails() {
        let pipeline = ScrapePipeline::new(fake_source(), None, config(false));
        let err = pipeline.scrape_user("nobody").await.unwrap_err();
        assert!(matches!(err, Error::UserNotFound(_)));
    }

    #[tokio::test]
    async fn test_save_outcome_recorded_in_metadata() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path()).unwrap();
        let pipeline = ScrapePipeline::new(
            fake_source(),
            Some(store),
            ScraperConfig {
                save_to_file: true,
                ..config(false)
            },
        );

        let data = pipeline.scrape_user("OctoCat").await.unwrap();
        let saved = data.metadata.saved_to_file.clone().unwrap();
        let saved = std::path::Path::new(&saved);
        assert!(saved.exists());

        let file_name = saved.file_name().unwrap().to_str().unwrap();
        assert!(file_name.starts_with("octocat_profile_"), "{}", file_name);
        assert!(data.metadata.save_error.is_none());
    }

    #[tokio::test]
    async fn test_save_failure_is_data_not_error() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path().join("out")).unwrap();
        std::fs::remove_dir_all(dir.path().join("out")).unwrap();
        std::fs::write(dir.path().join("out"), "not a directory").unwrap();

        let pipeline = ScrapePipeline::new(
            fake_source(),
            Some(store),
            ScraperConfig {
                save_to_file: true,
                ..config(false)
            },
        );

        let data = pipeline.scrape_user("octocat").await.unwrap();
        assert!(data.metadata.saved_to_file.is_none());
        assert!(data.metadata.save_error.is_some());
    }
}
