use serde::Deserialize;
use std::fmt;

/// State of a single submitted review, as reported by the review host.
///
/// Only `Approved` grants approval. `Commented` is neutral. Every other
/// state revokes any earlier approval from the same reviewer, including
/// states the host may introduce later.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Dismissed,
    Commented,
    Pending,
    #[serde(other)]
    Unknown,
}

impl ReviewState {
    pub fn grants_approval(&self) -> bool {
        matches!(self, ReviewState::Approved)
    }

    /// Whether this review replaces the reviewer's previous verdict.
    pub fn is_substantive(&self) -> bool {
        !matches!(self, ReviewState::Commented)
    }
}

/// One review in the pull request's chronological review stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewEvent {
    pub reviewer: String,
    pub state: ReviewState,
}

impl ReviewEvent {
    pub fn new(reviewer: impl Into<String>, state: ReviewState) -> Self {
        Self {
            reviewer: reviewer.into(),
            state,
        }
    }
}

/// Unique identifier for a pull request across repositories
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PullRequestId {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl PullRequestId {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, number: u64) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            number,
        }
    }
}

impl fmt::Display for PullRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}
