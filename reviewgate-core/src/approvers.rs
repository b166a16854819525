//! Folding a pull request's review history into its current approvers.
//!
//! A reviewer may leave many reviews. Only the most recent one that is not a
//! plain comment counts: an approval adds the reviewer, anything else
//! (changes requested, dismissed) takes them back out. The fold runs as one
//! continuous pass across every page of the feed.

use std::collections::BTreeSet;

use futures_util::{Stream, TryStreamExt};
use tracing::{debug, info};

use crate::feed::FeedError;
use crate::review::ReviewEvent;

/// Reviewers whose latest substantive review is an approval.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApproverSet {
    approvers: BTreeSet<String>,
}

impl ApproverSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one review to the set.
    pub fn record(&mut self, event: &ReviewEvent) {
        if event.state.grants_approval() {
            self.approvers.insert(event.reviewer.clone());
        } else if event.state.is_substantive() {
            self.approvers.remove(&event.reviewer);
        }
    }

    pub fn contains(&self, reviewer: &str) -> bool {
        self.approvers.contains(reviewer)
    }

    /// Login comparison the way the review host does it: ASCII case-insensitive.
    pub fn contains_ignore_case(&self, reviewer: &str) -> bool {
        self.approvers
            .iter()
            .any(|approver| approver.eq_ignore_ascii_case(reviewer))
    }

    pub fn len(&self) -> usize {
        self.approvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.approvers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.approvers.iter().map(String::as_str)
    }
}

impl Extend<ReviewEvent> for ApproverSet {
    fn extend<T: IntoIterator<Item = ReviewEvent>>(&mut self, events: T) {
        for event in events {
            self.record(&event);
        }
    }
}

impl<'a> Extend<&'a ReviewEvent> for ApproverSet {
    fn extend<T: IntoIterator<Item = &'a ReviewEvent>>(&mut self, events: T) {
        for event in events {
            self.record(event);
        }
    }
}

impl FromIterator<ReviewEvent> for ApproverSet {
    fn from_iter<T: IntoIterator<Item = ReviewEvent>>(events: T) -> Self {
        let mut set = Self::new();
        set.extend(events);
        set
    }
}

/// Drain a paginated review feed and return the final approvers.
///
/// The first feed error aborts the fold; no partial set is returned.
pub async fn collect_approvers<S>(pages: S) -> Result<ApproverSet, FeedError>
where
    S: Stream<Item = Result<Vec<ReviewEvent>, FeedError>>,
{
    let (approvers, page_count) = pages
        .try_fold(
            (ApproverSet::new(), 0usize),
            |(mut approvers, page_count), batch| async move {
                debug!(
                    "Folding review page {} ({} reviews)",
                    page_count + 1,
                    batch.len()
                );
                approvers.extend(batch);
                Ok((approvers, page_count + 1))
            },
        )
        .await?;

    info!(
        "Found {} approver(s) across {} page(s) of reviews",
        approvers.len(),
        page_count
    );
    Ok(approvers)
}
