//! Raw GitHub REST payloads, deserialized as returned by the API.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiUser {
    pub login: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub company: Option<String>,
    pub blog: Option<String>,
    pub twitter_username: Option<String>,
    pub location: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub public_repos: u32,
    #[serde(default)]
    pub followers: u32,
    #[serde(default)]
    pub following: u32,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiRepository {
    pub name: String,
    pub description: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub stargazers_count: u32,
    #[serde(default)]
    pub forks_count: u32,
    #[serde(default)]
    pub fork: bool,
    #[serde(default = "default_branch")]
    pub default_branch: String,
    pub owner: ApiOwner,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiOwner {
    pub login: String,
}

pub(crate) fn default_branch() -> String {
    "main".to_string()
}
