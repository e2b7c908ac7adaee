use serde::{Deserialize, Serialize};

use super::api::ApiUser;
use crate::error::{Error, Result};

/// Snapshot of one GitHub account as seen during a scrape.
///
/// Optional fields are `None` when the platform did not provide them, which
/// is different from `Some("")` (provided, but empty).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub company: Option<String>,
    pub website: Option<String>,
    /// Full profile URL, not the bare handle.
    pub twitter: Option<String>,
    pub location: Option<String>,
    pub email: Option<String>,
    pub public_repos: u32,
    pub followers: u32,
    pub following: u32,
    /// Raw README of the `<login>/<login>` repository.
    pub profile_readme: Option<String>,
    pub avatar_url: Option<String>,
    pub login: String,
}

impl UserProfile {
    pub fn new(
        login: impl Into<String>,
        public_repos: u32,
        followers: u32,
        following: u32,
    ) -> Result<Self> {
        let profile = Self {
            name: None,
            bio: None,
            company: None,
            website: None,
            twitter: None,
            location: None,
            email: None,
            public_repos,
            followers,
            following,
            profile_readme: None,
            avatar_url: None,
            login: login.into(),
        };
        profile.validate()?;
        Ok(profile)
    }

    pub fn from_api(user: ApiUser, profile_readme: Option<String>) -> Result<Self> {
        let profile = Self {
            name: user.name,
            bio: user.bio,
            company: user.company,
            website: user.blog,
            twitter: user
                .twitter_username
                .filter(|handle| !handle.trim().is_empty())
                .map(|handle| format!("https://twitter.com/{}", handle)),
            location: user.location,
            email: user.email,
            public_repos: user.public_repos,
            followers: user.followers,
            following: user.following,
            profile_readme,
            avatar_url: user.avatar_url,
            login: user.login,
        };
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<()> {
        if self.login.trim().is_empty() {
            return Err(Error::validation("user profile login must not be empty"));
        }
        Ok(())
    }

    pub fn has_profile_readme(&self) -> bool {
        self.profile_readme
            .as_deref()
            .is_some_and(|readme| !readme.is_empty())
    }
}
