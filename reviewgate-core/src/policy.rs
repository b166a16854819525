//! Approval policy and its evaluation against the current approvers.

use crate::approvers::ApproverSet;
use crate::format::format_missing_approvals;

/// Prefix of every failure message.
pub const FAILURE_PREFIX: &str = "Review is still required from: ";

/// What a pull request needs before the check passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    /// Minimum number of distinct approvers.
    pub required_approvals: u32,
    /// People who must approve regardless of the count, in reporting order.
    pub required_reviewers: Vec<String>,
}

impl Default for Policy {
    /// One approval from anyone.
    fn default() -> Self {
        Self {
            required_approvals: 1,
            required_reviewers: Vec::new(),
        }
    }
}

impl Policy {
    pub fn new(required_approvals: u32, required_reviewers: Vec<String>) -> Self {
        Self {
            required_approvals,
            required_reviewers,
        }
    }

    /// Required approvals minus actual approvers, without clamping.
    ///
    /// Negative when the pull request has more approvals than it needs.
    pub fn shortfall(&self, approvers: &ApproverSet) -> i64 {
        i64::from(self.required_approvals) - approvers.len() as i64
    }

    pub fn evaluate(&self, approvers: &ApproverSet) -> Verdict {
        let missing_count = u32::try_from(self.shortfall(approvers).max(0)).unwrap_or(u32::MAX);

        let missing_people: Vec<String> = self
            .required_reviewers
            .iter()
            .filter(|reviewer| !approvers.contains_ignore_case(reviewer))
            .cloned()
            .collect();

        match Deficit::new(missing_count, missing_people) {
            Some(deficit) => Verdict::Unmet(deficit),
            None => Verdict::Satisfied,
        }
    }
}

/// Outstanding approvals. Never empty: a pull request with nothing
/// outstanding is [`Verdict::Satisfied`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deficit {
    missing_count: u32,
    missing_people: Vec<String>,
}

impl Deficit {
    /// Returns `None` when nothing is missing.
    pub fn new(missing_count: u32, missing_people: Vec<String>) -> Option<Self> {
        if missing_count == 0 && missing_people.is_empty() {
            None
        } else {
            Some(Self {
                missing_count,
                missing_people,
            })
        }
    }

    pub fn missing_count(&self) -> u32 {
        self.missing_count
    }

    pub fn missing_people(&self) -> &[String] {
        &self.missing_people
    }

    pub fn describe(&self) -> String {
        format_missing_approvals(self.missing_count, &self.missing_people)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Satisfied,
    Unmet(Deficit),
}

impl Verdict {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Verdict::Satisfied)
    }

    /// The message the check fails with, or `None` if it should pass.
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            Verdict::Satisfied => None,
            Verdict::Unmet(deficit) => Some(format!("{}{}", FAILURE_PREFIX, deficit.describe())),
        }
    }
}
