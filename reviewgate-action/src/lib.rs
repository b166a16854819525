pub mod config;
pub mod report;

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use reviewgate_core::{
    check_pull_request, reviews_to_events, GitHubClient, GitHubReview, StaticFeed, Verdict,
};

pub use config::{Args, Config, ReviewSource};
pub use report::{report, Outcome};

/// Run the check described by `config` and return its verdict.
///
/// Feed errors are returned with their original message so they can be
/// reported as the check's failure reason unchanged.
pub async fn run(config: &Config) -> Result<Verdict> {
    info!(
        "Checking reviews on PR #{} in {}/{}",
        config.pull_request.number, config.pull_request.owner, config.pull_request.repo
    );

    let verdict = match &config.source {
        ReviewSource::GitHub { api_url, token } => {
            let client = GitHubClient::new(api_url, token.clone())
                .context("Failed to create GitHub client")?;
            check_pull_request(&client, &config.pull_request, &config.policy).await?
        }
        ReviewSource::File(path) => {
            let feed = load_reviews_file(path).await?;
            check_pull_request(&feed, &config.pull_request, &config.policy).await?
        }
    };

    Ok(verdict)
}

/// Load a saved JSON array of GitHub review objects as a single-page feed.
pub async fn load_reviews_file(path: &Path) -> Result<StaticFeed> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read reviews file {}", path.display()))?;

    let reviews: Vec<GitHubReview> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse reviews file {}", path.display()))?;

    info!("Loaded {} reviews from {}", reviews.len(), path.display());
    Ok(StaticFeed::new(vec![reviews_to_events(reviews)]))
}
