use serde::de::DeserializeOwned;
use crate::error::{Error, Result};
use crate::github::client::GitHubClient;

pub struct Paginator<'a> {
    client: &'a GitHubClient,
}

impl<'a> Paginator<'a> {
    pub fn new(client: &'a GitHubClient) -> Self {
        Self { client }
    }

    pub async fn fetch_all<T: DeserializeOwned>(
        &self,
        base_url: &str,
        per_page: u32,
    ) -> Result<Vec<T>> {
        self.fetch(base_url, per_page, None).await
    }

    pub async fn fetch_limited<T: DeserializeOwned>(
        &self,
        base_url: &str,
        per_page: u32,
        max_items: u32,
    ) -> Result<Vec<T>> {
        self.fetch(base_url, per_page.min(max_items.max(1)), Some(max_items as usize))
            .await
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        base_url: &str,
        per_page: u32,
        max_items: Option<usize>,
    ) -> Result<Vec<T>> {
        let mut all_items = Vec::new();
        let mut page = 1;

        loop {
            let separator = if base_url.contains('?') { "&" } else { "?" };
            let url = format!("{}{}per_page={}&page={}", base_url, separator, per_page, page);

            tracing::debug!("Fetching: {}", url);
            let response = self.client.get(&url).await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::GitHubApi(format!(
                    "Failed to fetch {}: {} - {}",
                    url, status, body
                )));
            }

            // An absent Link header means a single page
            let has_next = response
                .headers()
                .get("link")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.contains("rel=\"next\""))
                .unwrap_or(false);

            let items: Vec<T> = response.json().await?;
            let items_count = items.len();
            all_items.extend(items);

            let limit_reached = max_items.is_some_and(|max| all_items.len() >= max);
            if limit_reached || !has_next || items_count < per_page as usize {
                break;
            }

            page += 1;
        }

        if let Some(max) = max_items {
            all_items.truncate(max);
        }
        Ok(all_items)
    }
}
