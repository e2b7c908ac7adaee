use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::DEFAULT_API_URL;
use crate::error::{Error, Result};
use crate::github::paginator::Paginator;
use crate::github::rate_limiter::{seconds_until_reset, RateLimiter};
use crate::models::{ApiRepository, ApiUser, LanguageBytes};

/// File names tried, in order, when looking for a repository README.
pub const README_NAMES: [&str; 5] = ["README.md", "readme.md", "README.rst", "README.txt", "README"];

const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw+json";
const MIN_RATE_LIMIT_WAIT_SECS: u64 = 60;

pub struct GitHubClient {
    client: Client,
    rate_limiter: RateLimiter,
    base_url: String,
    requests: AtomicU64,
}

impl GitHubClient {
    pub fn new(token: Option<&str>) -> Result<Self> {
        Self::with_base_url(token, DEFAULT_API_URL, RateLimiter::new())
    }

    pub fn with_base_url(
        token: Option<&str>,
        base_url: &str,
        rate_limiter: RateLimiter,
    ) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        match token {
            Some(token) => {
                headers.insert(
                    header::AUTHORIZATION,
                    header::HeaderValue::from_str(&format!("Bearer {}", token))?,
                );
                tracing::info!("GitHub token provided - higher rate limits available");
            }
            None => tracing::warn!("No GitHub token provided - rate limits may apply"),
        }
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            header::HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(concat!("readmegen/", env!("CARGO_PKG_VERSION"))),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            rate_limiter,
            base_url: base_url.trim_end_matches('/').to_string(),
            requests: AtomicU64::new(0),
        })
    }

    /// Sends a request through the rate limiter and counts it.
    ///
    /// A 403/429 that GitHub attributes to rate limiting becomes
    /// [`Error::RateLimited`]; every other status is returned to the caller.
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response> {
        self.rate_limiter.wait().await;
        self.requests.fetch_add(1, Ordering::Relaxed);

        let response = request.send().await?;
        self.rate_limiter.update_from_response(&response).await;

        if let Some(remaining) = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
        {
            tracing::debug!("Rate limit remaining: {}", remaining);
        }

        let status = response.status();
        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            let wait_secs = seconds_until_reset(response.headers())
                .unwrap_or(0)
                .max(MIN_RATE_LIMIT_WAIT_SECS);
            let url = response.url().to_string();
            let body = response.text().await.unwrap_or_default();
            if status == StatusCode::TOO_MANY_REQUESTS || body.to_lowercase().contains("rate limit") {
                tracing::warn!("Rate limit exceeded on {}, reset in {}s", url, wait_secs);
                return Err(Error::RateLimited(wait_secs));
            }
            return Err(Error::GitHubApi(format!("Forbidden: {} - {}", url, body)));
        }

        Ok(response)
    }

    pub(crate) async fn get(&self, url: &str) -> Result<Response> {
        self.send(self.client.get(url)).await
    }

    pub async fn get_user(&self, username: &str) -> Result<ApiUser> {
        let url = format!("{}/users/{}", self.base_url, username);
        tracing::info!("Fetching user: {}", username);

        let response = self.get(&url).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::UserNotFound(username.to_string()));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::GitHubApi(format!(
                "Failed to fetch user {}: {} - {}",
                username, status, body
            )));
        }

        Ok(response.json().await?)
    }

    pub async fn get_user_repos(
        &self,
        username: &str,
        max_repos: Option<u32>,
    ) -> Result<Vec<ApiRepository>> {
        let url = format!(
            "{}/users/{}/repos?sort=updated&direction=desc",
            self.base_url, username
        );
        let paginator = Paginator::new(self);
        tracing::info!("Fetching repositories for: {}", username);
        match max_repos {
            Some(max) => paginator.fetch_limited(&url, 100, max).await,
            None => paginator.fetch_all(&url, 100).await,
        }
    }

    pub async fn get_repo_languages(&self, owner: &str, repo: &str) -> Result<LanguageBytes> {
        let url = format!("{}/repos/{}/{}/languages", self.base_url, owner, repo);

        let response = self.get(&url).await?;

        if !response.status().is_success() {
            tracing::debug!("No languages for {}/{}: {}", owner, repo, response.status());
            return Ok(LanguageBytes::new());
        }

        Ok(response.json().await?)
    }

    /// Raw text of the first README found under [`README_NAMES`].
    pub async fn get_readme(&self, owner: &str, repo: &str) -> Result<Option<String>> {
        for readme_name in README_NAMES {
            let url = format!(
                "{}/repos/{}/{}/contents/{}",
                self.base_url, owner, repo, readme_name
            );
            let request = self
                .client
                .get(&url)
                .header(header::ACCEPT, RAW_MEDIA_TYPE);
            let response = self.send(request).await?;

            if !response.status().is_success() {
                continue;
            }

            let content = response.text().await?;
            if !content.is_empty() {
                tracing::info!(
                    "Found README: {} in {} ({} characters)",
                    readme_name,
                    repo,
                    content.chars().count()
                );
                return Ok(Some(content));
            }
        }

        tracing::debug!("No README found for repository: {}/{}", owner, repo);
        Ok(None)
    }

    /// Requests sent since this client was created.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
