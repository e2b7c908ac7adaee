use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::CompleteUserData;

const PROFILE_MARKER: &str = "_profile_";

/// Writes finished scrapes as pretty JSON documents into one output directory.
pub struct JsonStore {
    output_dir: PathBuf,
}

impl JsonStore {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir)?;
        tracing::info!("Output directory: {}", output_dir.display());
        Ok(Self { output_dir })
    }

    /// Saves under `<username>_profile_<YYYYmmdd_HHMMSS>.json` and returns the path.
    pub fn save(&self, data: &CompleteUserData, username: &str) -> Result<PathBuf> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = self
            .output_dir
            .join(format!("{}{}{}.json", username, PROFILE_MARKER, timestamp));

        let json = serde_json::to_string_pretty(data)?;
        fs::write(&path, json).map_err(|e| {
            tracing::error!("Failed to save data to {}: {}", path.display(), e);
            e
        })?;

        tracing::info!("Data saved to: {}", path.display());
        Ok(path)
    }

    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<CompleteUserData> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let data: CompleteUserData = serde_json::from_str(&contents)?;
        data.validate()?;
        tracing::info!("Data loaded from: {}", path.display());
        Ok(data)
    }

    /// Saved profile file names, most recent first.
    pub fn list_saved_profiles(&self) -> Result<Vec<String>> {
        let mut files: Vec<String> = fs::read_dir(&self.output_dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.contains(PROFILE_MARKER) && name.ends_with(".json"))
            .collect();

        // Timestamps share a prefix per user, so sort on the timestamp suffix
        files.sort_by(|a, b| timestamp_of(b).cmp(timestamp_of(a)).then_with(|| a.cmp(b)));
        Ok(files)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

fn timestamp_of(file_name: &str) -> &str {
    file_name
        .rsplit_once(PROFILE_MARKER)
        .map(|(_, rest)| rest)
        .unwrap_or(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Repository, ScrapingMetadata, UserProfile};
    use chrono::Utc;
    use tempfile::TempDir;

    fn sample() -> CompleteUserData {
        let profile = UserProfile::new("octocat", 1, 0, 0).unwrap();
        let mut repo = Repository::new("hello", "https://github.com/octocat/hello").unwrap();
        repo.stars = 2;
        repo.languages.insert("Rust".to_string(), 1024);
        CompleteUserData::from_parts(profile, vec![repo], ScrapingMetadata::new(Utc::now(), 3))
            .unwrap()
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path().join("output")).unwrap();
        let data = sample();

        let path = store.save(&data, "octocat").unwrap();
        assert!(path.exists());
        assert!(path.starts_with(store.output_dir()));

        let loaded = store.load(&path).unwrap();
        assert_eq!(loaded, data);
    }

    #[test]
    fn test_list_saved_profiles_newest_first() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path()).unwrap();

        fs::write(dir.path().join("alice_profile_20240101_120000.json"), "{}").unwrap();
        fs::write(dir.path().join("bob_profile_20250101_090000.json"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::write(dir.path().join("alice_profile_20240101_120000.bak"), "").unwrap();

        let files = store.list_saved_profiles().unwrap();
        assert_eq!(
            files,
            vec![
                "bob_profile_20250101_090000.json",
                "alice_profile_20240101_120000.json"
            ]
        );
    }

    #[test]
    fn test_load_rejects_inconsistent_document() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path()).unwrap();

        let mut value = serde_json::to_value(sample()).unwrap();
        value["statistics"]["total_stars"] = serde_json::json!(99);
        let path = dir.path().join("octocat_profile_20250101_000000.json");
        fs::write(&path, value.to_string()).unwrap();

        assert!(matches!(
            store.load(&path),
            Err(crate::error::Error::Validation(_))
        ));
    }
}
