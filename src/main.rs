use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use readmegen::{
    CompleteUserData, Config, GitHubClient, JsonStore, RateLimiter, ScrapePipeline, ScraperConfig,
    Storage,
};

#[derive(Parser, Debug)]
#[command(name = "readmegen")]
#[command(version)]
#[command(about = "Scrape a GitHub profile and its repositories for README generation")]
struct Args {
    /// GitHub username to scrape
    username: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    output: Option<String>,

    /// Directory for saved JSON scrapes (overrides OUTPUT_DIR)
    #[arg(long)]
    output_dir: Option<String>,

    /// Do not save the scrape as a JSON file
    #[arg(long)]
    no_save: bool,

    /// Leave forked repositories out
    #[arg(long)]
    exclude_forks: bool,

    /// Only process the most recently updated N repositories (counted after
    /// --exclude-forks drops forks)
    #[arg(long)]
    max_repos: Option<u32>,

    /// Snapshot database path (overrides DATABASE_PATH)
    #[arg(long)]
    database: Option<String>,

    /// Use the latest stored snapshot if available
    #[arg(long)]
    cached: bool,

    /// Print stored snapshot history and exit
    #[arg(long)]
    history: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = Config::from_env()?;

    // Console logs go to stderr so JSON on stdout stays parseable
    let _log_guard = readmegen::logging::init_logging(config.log_file.as_deref())?;

    let database = args.database.clone().unwrap_or_else(|| config.database_path.clone());
    let storage = Storage::new(&database)?;

    if args.history {
        let history = storage.snapshot_history(&args.username)?;
        if history.is_empty() {
            println!("No stored snapshots for {}", args.username);
        }
        for snapshot in history {
            println!(
                "{}  repos: {:>4}  stars: {:>6}  forks: {:>5}  followers: {:>6}  (v{})",
                snapshot.scraped_at.format("%Y-%m-%d %H:%M:%S UTC"),
                snapshot.total_repositories,
                snapshot.total_stars,
                snapshot.total_forks,
                snapshot.followers,
                snapshot.scraper_version
            );
        }
        return Ok(());
    }

    if args.cached {
        if let Some(data) = storage.latest_snapshot(&args.username)? {
            tracing::info!("Using cached snapshot from {}", data.metadata.scraped_at);
            output_data(&data, &args)?;
            return Ok(());
        }
        tracing::info!("No cached snapshot found, performing fresh scrape");
    }

    let github = GitHubClient::with_base_url(
        config.github_token.as_deref(),
        &config.api_url,
        RateLimiter::with_soft_limit(config.requests_per_minute),
    )?;

    let mut scraper_config = ScraperConfig::from(&config);
    scraper_config.max_repositories = args.max_repos;
    if args.exclude_forks {
        scraper_config.include_forks = false;
    }
    if args.no_save {
        scraper_config.save_to_file = false;
    }

    let store = if scraper_config.save_to_file {
        let output_dir = args
            .output_dir
            .clone()
            .map(PathBuf::from)
            .unwrap_or_else(|| config.output_dir.clone());
        Some(JsonStore::new(output_dir)?)
    } else {
        None
    };

    let pipeline = ScrapePipeline::new(github, store, scraper_config);
    let data = pipeline.scrape_user(&args.username).await?;

    if let Err(e) = storage.save_snapshot(&data) {
        tracing::warn!("Failed to store snapshot in {}: {}", database, e);
    }

    output_data(&data, &args)?;

    Ok(())
}

fn output_data(data: &CompleteUserData, args: &Args) -> anyhow::Result<()> {
    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::Text => format_text(data),
    };

    if let Some(ref path) = args.output {
        std::fs::write(path, &output)?;
        tracing::info!("Output written to: {}", path);
    } else {
        println!("{}", output);
    }

    Ok(())
}

fn format_text(data: &CompleteUserData) -> String {
    let profile = &data.profile;
    let stats = &data.statistics;
    let mut output = String::new();

    let or_none = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

    output.push_str(&format!(
        "\n=== Profile Information for {} ===\n",
        profile.login
    ));
    output.push_str(&format!("Name: {}\n", or_none(&profile.name)));
    output.push_str(&format!("Bio: {}\n", or_none(&profile.bio)));
    output.push_str(&format!("Company: {}\n", or_none(&profile.company)));
    output.push_str(&format!("Website: {}\n", or_none(&profile.website)));
    output.push_str(&format!("Location: {}\n", or_none(&profile.location)));
    output.push_str(&format!("Public Repos: {}\n", profile.public_repos));
    output.push_str(&format!(
        "Followers: {} / Following: {}\n",
        profile.followers, profile.following
    ));
    output.push_str(&format!(
        "Profile README: {}\n",
        if profile.has_profile_readme() { "Yes" } else { "No" }
    ));

    output.push_str("\n=== Repository Statistics ===\n");
    output.push_str(&format!(
        "Total repositories scraped: {}\n",
        stats.total_repositories
    ));
    output.push_str(&format!(
        "Repositories with README: {}\n",
        stats.repositories_with_readme
    ));
    output.push_str(&format!("Total stars: {}\n", stats.total_stars));
    output.push_str(&format!("Total forks: {}\n", stats.total_forks));

    let languages: Vec<String> = stats
        .language_percentages()
        .into_iter()
        .take(5)
        .map(|(name, share)| format!("{} ({:.1}%)", name, share))
        .collect();
    if !languages.is_empty() {
        output.push_str(&format!("Languages used: {}\n", languages.join(", ")));
    }

    if !data.repositories.is_empty() {
        output.push_str("\n=== Sample Repositories (First 3) ===\n");
    }
    for repo in data.repositories.iter().take(3) {
        output.push_str(&format!("\nRepository: {}\n", repo.name));
        output.push_str(&format!("  Description: {}\n", or_none(&repo.description)));
        output.push_str(&format!("  Stars: {}\n", repo.stars));
        if let Some(language) = repo.primary_language() {
            output.push_str(&format!("  Primary language: {}\n", language));
        }
        output.push_str(&format!(
            "  README length: {} characters\n",
            repo.readme_content.as_deref().map_or(0, |c| c.chars().count())
        ));
    }

    let metadata = &data.metadata;
    output.push_str(&format!(
        "\nScraped at {} with {} API requests (v{})\n",
        metadata.scraped_at.format("%Y-%m-%d %H:%M:%S UTC"),
        metadata.total_api_requests,
        metadata.scraper_version
    ));
    if let Some(ref path) = metadata.saved_to_file {
        output.push_str(&format!("Data saved to: {}\n", path));
    }
    if let Some(ref error) = metadata.save_error {
        output.push_str(&format!("Save failed: {}\n", error));
    }

    output
}
