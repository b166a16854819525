pub mod approvers;
pub mod feed;
pub mod format;
pub mod github;
pub mod policy;
pub mod review;

pub use approvers::{collect_approvers, ApproverSet};
pub use feed::{FeedError, ReviewFeed, ReviewPages, StaticFeed};
pub use format::{format_comma_separated_list, format_missing_approvals};
pub use github::{reviews_to_events, GitHubClient, GitHubReview, DEFAULT_API_URL};
pub use policy::{Deficit, Policy, Verdict};
pub use review::{PullRequestId, ReviewEvent, ReviewState};

use tracing::info;

/// Fold a pull request's reviews and evaluate them against `policy`.
///
/// The feed is drained completely before the policy is consulted. A feed
/// error aborts the check and is returned unchanged.
pub async fn check_pull_request<F>(
    feed: &F,
    pr: &PullRequestId,
    policy: &Policy,
) -> Result<Verdict, FeedError>
where
    F: ReviewFeed + ?Sized,
{
    let approvers = collect_approvers(feed.review_pages(pr)).await?;
    info!(
        "Approvers for {}: [{}]",
        pr,
        approvers.iter().collect::<Vec<_>>().join(", ")
    );

    let verdict = policy.evaluate(&approvers);
    info!("Verdict for {}: {:?}", pr, verdict);
    Ok(verdict)
}
