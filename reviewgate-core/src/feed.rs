//! The review feed: where review events come from.
//!
//! A feed yields the reviews of one pull request as a stream of pages,
//! oldest first. Each call to [`ReviewFeed::review_pages`] starts a fresh,
//! finite pass; the stream itself cannot be rewound.

use futures_util::stream::{self, BoxStream, StreamExt};
use thiserror::Error;

use crate::review::{PullRequestId, ReviewEvent};

/// A stream of review batches, in chronological order.
pub type ReviewPages<'a> = BoxStream<'a, Result<Vec<ReviewEvent>, FeedError>>;

/// Failure while reading the review feed. Every variant is fatal to the run.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to reach the review host")]
    Transport(#[from] reqwest::Error),

    #[error("review host rejected the credentials ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("{}", rate_limited_message(.reset_at))]
    RateLimited { reset_at: Option<u64> },

    #[error("review host API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("failed to decode review page {page}")]
    Decode {
        page: u32,
        #[source]
        source: serde_json::Error,
    },
}

fn rate_limited_message(reset_at: &Option<u64>) -> String {
    match reset_at {
        Some(reset) => format!("review host rate limit exceeded (resets at unix time {reset})"),
        None => "review host rate limit exceeded".to_string(),
    }
}

/// Source of a pull request's review history.
pub trait ReviewFeed {
    fn review_pages<'a>(&'a self, pr: &'a PullRequestId) -> ReviewPages<'a>;
}

/// A feed over batches that are already in memory.
///
/// Used for offline replay of saved review lists. A failure can be
/// injected after a number of pages to exercise the abort path.
#[derive(Debug, Clone, Default)]
pub struct StaticFeed {
    pages: Vec<Vec<ReviewEvent>>,
    fail_after: Option<(usize, u16, String)>,
}

impl StaticFeed {
    pub fn new(pages: Vec<Vec<ReviewEvent>>) -> Self {
        Self {
            pages,
            fail_after: None,
        }
    }

    /// Serve `pages_served` pages, then fail with an API error.
    pub fn failing_after(mut self, pages_served: usize, status: u16, message: &str) -> Self {
        self.fail_after = Some((pages_served, status, message.to_string()));
        self
    }
}

impl ReviewFeed for StaticFeed {
    fn review_pages<'a>(&'a self, _pr: &'a PullRequestId) -> ReviewPages<'a> {
        let served = match &self.fail_after {
            Some((n, _, _)) => (*n).min(self.pages.len()),
            None => self.pages.len(),
        };
        let pages = stream::iter(self.pages[..served].iter().cloned().map(Ok::<_, FeedError>));

        match &self.fail_after {
            Some((_, status, message)) => pages
                .chain(stream::once(async move {
                    Err(FeedError::Api {
                        status: *status,
                        message: message.clone(),
                    })
                }))
                .boxed(),
            None => pages.boxed(),
        }
    }
}
