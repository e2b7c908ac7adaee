use async_trait::async_trait;

use crate::error::Result;
use crate::github::client::GitHubClient;
use crate::models::{ApiRepository, ApiUser, LanguageBytes};

/// Where the scrape pipeline reads profile and repository data from.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn fetch_user(&self, username: &str) -> Result<ApiUser>;
    async fn fetch_repositories(
        &self,
        username: &str,
        max_repos: Option<u32>,
    ) -> Result<Vec<ApiRepository>>;
    async fn fetch_languages(&self, owner: &str, repo: &str) -> Result<LanguageBytes>;
    async fn fetch_readme(&self, owner: &str, repo: &str) -> Result<Option<String>>;
    /// Running total of API calls made by this source.
    fn api_requests(&self) -> u64;
}

#[async_trait]
impl ProfileSource for GitHubClient {
    async fn fetch_user(&self, username: &str) -> Result<ApiUser> {
        self.get_user(username).await
    }

    async fn fetch_repositories(
        &self,
        username: &str,
        max_repos: Option<u32>,
    ) -> Result<Vec<ApiRepository>> {
        self.get_user_repos(username, max_repos).await
    }

    async fn fetch_languages(&self, owner: &str, repo: &str) -> Result<LanguageBytes> {
        self.get_repo_languages(owner, repo).await
    }

    async fn fetch_readme(&self, owner: &str, repo: &str) -> Result<Option<String>> {
        self.get_readme(owner, repo).await
    }

    fn api_requests(&self) -> u64 {
        self.request_count()
    }
}
