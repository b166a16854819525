//! Turning a verdict into a CI result.
//!
//! Failures are written as a GitHub Actions `::error::` workflow command so
//! the message shows up as an annotation on the run, and the process exits
//! non-zero.

use std::io::{self, Write};
use std::process::ExitCode;
use tracing::info;

use reviewgate_core::Verdict;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed(String),
}

impl Outcome {
    pub fn from_verdict(verdict: &Verdict) -> Self {
        match verdict.failure_reason() {
            Some(reason) => Outcome::Failed(reason),
            None => Outcome::Passed,
        }
    }

    /// Failure carrying the full context chain of `err`.
    pub fn from_error(err: &anyhow::Error) -> Self {
        Outcome::Failed(format!("{:#}", err))
    }

    pub fn exit_code(&self) -> ExitCode {
        match self {
            Outcome::Passed => ExitCode::SUCCESS,
            Outcome::Failed(_) => ExitCode::FAILURE,
        }
    }
}

/// Escape a message for use as workflow command data.
pub fn escape_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

pub fn error_command(message: &str) -> String {
    format!("::error::{}", escape_data(message))
}

pub fn report<W: Write>(outcome: &Outcome, out: &mut W) -> io::Result<()> {
    match outcome {
        Outcome::Passed => {
            info!("All required reviewers approved!");
            Ok(())
        }
        Outcome::Failed(message) => {
            writeln!(out, "{}", error_command(message))?;
            out.flush()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reviewgate_core::{Deficit, FeedError};

    #[test]
    fn test_escape_data() {
        assert_eq!(escape_data("100% done\r\nnext"), "100%25 done%0D%0Anext");
        assert_eq!(escape_data("plain"), "plain");
    }

    #[test]
    fn test_passed_writes_nothing() {
        let mut out = Vec::new();
        report(&Outcome::Passed, &mut out).unwrap();
        assert!(out.is_empty());
        assert_eq!(Outcome::Passed.exit_code(), ExitCode::SUCCESS);
    }

    #[test]
    fn test_unmet_verdict_reports_error_command() {
        let verdict = Verdict::Unmet(Deficit::new(2, vec!["bob".to_string()]).unwrap());
        let outcome = Outcome::from_verdict(&verdict);

        let mut out = Vec::new();
        report(&outcome, &mut out).unwrap();

        insta::assert_snapshot!(
            String::from_utf8(out).unwrap().trim_end(),
            @"::error::Review is still required from: at least 2 additional code owners and bob"
        );
        assert_eq!(outcome.exit_code(), ExitCode::FAILURE);
    }

    #[test]
    fn test_error_outcome_keeps_context_chain() {
        let err = anyhow::anyhow!("connection refused").context("Failed to read reviews file x");
        assert_eq!(
            Outcome::from_error(&err),
            Outcome::Failed("Failed to read reviews file x: connection refused".to_string())
        );
    }

    #[test]
    fn test_feed_error_cause_appears_once() {
        let cause = serde_json::from_str::<Vec<u8>>("{}").unwrap_err();
        let expected = format!("failed to decode review page 1: {}", cause);
        let err = anyhow::Error::from(FeedError::Decode {
            page: 1,
            source: cause,
        });

        assert_eq!(Outcome::from_error(&err), Outcome::Failed(expected));
    }
}
