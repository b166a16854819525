use futures_util::stream::{self, StreamExt};
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::feed::{FeedError, ReviewFeed, ReviewPages};
use crate::review::{PullRequestId, ReviewEvent, ReviewState};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Largest page size the reviews endpoint accepts.
pub const REVIEWS_PER_PAGE: usize = 100;

const USER_AGENT: &str = concat!("reviewgate/", env!("CARGO_PKG_VERSION"));

/// Read-only GitHub REST client for pull request reviews.
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    api_url: String,
    token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubReview {
    pub id: u64,
    /// `None` for reviews left by since-deleted accounts.
    pub user: Option<ReviewUser>,
    pub state: ReviewState,
    pub submitted_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewUser {
    pub login: String,
}

impl GitHubReview {
    pub fn into_event(self) -> Option<ReviewEvent> {
        match self.user {
            Some(user) => Some(ReviewEvent::new(user.login, self.state)),
            None => {
                warn!("Skipping review {} with no author", self.id);
                None
            }
        }
    }
}

/// Convert a page of GitHub reviews into review events, preserving order.
pub fn reviews_to_events(reviews: Vec<GitHubReview>) -> Vec<ReviewEvent> {
    reviews
        .into_iter()
        .filter_map(GitHubReview::into_event)
        .collect()
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

impl GitHubClient {
    pub fn new(api_url: &str, token: String) -> Result<Self, FeedError> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn reviews_url(&self, pr: &PullRequestId, page: u32) -> String {
        format!(
            "{}/repos/{}/{}/pulls/{}/reviews?per_page={}&page={}",
            self.api_url, pr.owner, pr.repo, pr.number, REVIEWS_PER_PAGE, page
        )
    }

    /// Fetch one page of reviews, oldest first.
    pub async fn get_review_page(
        &self,
        pr: &PullRequestId,
        page: u32,
    ) -> Result<Vec<GitHubReview>, FeedError> {
        let url = self.reviews_url(pr, page);
        debug!("Fetching review page {} for {}", page, pr);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let error_text = response.text().await.unwrap_or_default();
            error!(
                "GitHub API error fetching reviews page {}: {} - {}",
                page, status, error_text
            );
            return Err(classify_error(status, &headers, &error_text));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|source| FeedError::Decode { page, source })
    }
}

impl ReviewFeed for GitHubClient {
    fn review_pages<'a>(&'a self, pr: &'a PullRequestId) -> ReviewPages<'a> {
        info!(
            "Fetching reviews for PR #{} in {}/{}",
            pr.number, pr.owner, pr.repo
        );

        stream::try_unfold(Some(1u32), move |next_page| async move {
            let Some(page) = next_page else {
                return Ok::<_, FeedError>(None);
            };

            let reviews = self.get_review_page(pr, page).await?;
            // A short page is the last page
            let next_page = if reviews.len() < REVIEWS_PER_PAGE {
                None
            } else {
                Some(page + 1)
            };

            Ok(Some((reviews_to_events(reviews), next_page)))
        })
        .boxed()
    }
}

fn classify_error(status: StatusCode, headers: &HeaderMap, body: &str) -> FeedError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.trim().to_string());

    let remaining = header_u64(headers, "x-ratelimit-remaining");
    let rate_limited = status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && remaining == Some(0));

    if rate_limited {
        FeedError::RateLimited {
            reset_at: header_u64(headers, "x-ratelimit-reset"),
        }
    } else if status == StatusCode::UNAUTHORIZED {
        FeedError::Unauthorized {
            status: status.as_u16(),
            message,
        }
    } else {
        FeedError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}
