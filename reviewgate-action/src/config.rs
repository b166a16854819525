use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::fs;
use std::path::PathBuf;

use reviewgate_core::{Policy, PullRequestId, DEFAULT_API_URL};

/// Reviewgate: fail a CI check until a pull request has the required approvals
#[derive(Parser, Default, Clone)]
#[command(name = "reviewgate")]
#[command(about = "Fail a CI check until a pull request has the required approvals", long_about = None)]
pub struct Args {
    /// Repository as owner/name (defaults to the repository of the triggering event)
    #[arg(long)]
    pub repo: Option<String>,

    /// Pull request number (defaults to the pull request of the triggering event)
    #[arg(long)]
    pub pr: Option<u64>,

    /// GitHub token (if not provided, uses the `token` action input, then GITHUB_TOKEN)
    #[arg(long)]
    pub token: Option<String>,

    /// GitHub API base URL (if not provided, uses GITHUB_API_URL)
    #[arg(long)]
    pub api_url: Option<String>,

    /// Number of distinct approvals required
    #[arg(long)]
    pub required_approvals: Option<u32>,

    /// Reviewer who must approve regardless of the count; may be repeated
    #[arg(long = "required-reviewer")]
    pub required_reviewers: Vec<String>,

    /// Evaluate a saved JSON list of reviews instead of calling the GitHub API
    #[arg(long)]
    pub reviews_file: Option<PathBuf>,

    /// Log at debug level
    #[arg(long)]
    pub verbose: bool,
}

/// Where the review history comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum ReviewSource {
    GitHub { api_url: String, token: String },
    File(PathBuf),
}

impl fmt::Debug for ReviewSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewSource::GitHub { api_url, .. } => f
                .debug_struct("GitHub")
                .field("api_url", api_url)
                .field("token", &"[REDACTED]")
                .finish(),
            ReviewSource::File(path) => f.debug_tuple("File").field(path).finish(),
        }
    }
}

/// Everything one run needs, resolved once up front.
#[derive(Debug, Clone)]
pub struct Config {
    pub pull_request: PullRequestId,
    pub policy: Policy,
    pub source: ReviewSource,
}

#[derive(Debug, Deserialize)]
struct EventPayload {
    repository: Option<RepositoryPayload>,
    pull_request: Option<PullRequestPayload>,
}

#[derive(Debug, Deserialize)]
struct RepositoryPayload {
    name: String,
    owner: OwnerPayload,
}

#[derive(Debug, Deserialize)]
struct OwnerPayload {
    login: String,
}

#[derive(Debug, Deserialize)]
struct PullRequestPayload {
    number: u64,
}

impl Config {
    pub fn from_env(args: &Args) -> Result<Self> {
        Self::resolve(args, |name| env::var(name).ok())
    }

    /// Resolve configuration from flags first, then from the environment
    /// as seen through `lookup`.
    pub fn resolve<F>(args: &Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pull_request = resolve_pull_request(args, &lookup)?;

        let required_approvals = match args.required_approvals {
            Some(n) => n,
            None => match get_input(&lookup, "required-approvals") {
                Some(value) => parse_required_approvals(&value)?,
                None => Policy::default().required_approvals,
            },
        };

        let required_reviewers = if args.required_reviewers.is_empty() {
            get_input(&lookup, "required-reviewers")
                .map(|value| parse_required_reviewers(&value))
                .unwrap_or_default()
        } else {
            parse_required_reviewers(&args.required_reviewers.join(","))
        };

        let source = match &args.reviews_file {
            Some(path) => ReviewSource::File(path.clone()),
            None => {
                let token = args
                    .token
                    .clone()
                    .or_else(|| get_input(&lookup, "token"))
                    .or_else(|| non_empty(lookup("GITHUB_TOKEN")))
                    .context(
                        "No GitHub token: set the `token` input, set GITHUB_TOKEN, or pass --token",
                    )?;
                let api_url = args
                    .api_url
                    .clone()
                    .or_else(|| non_empty(lookup("GITHUB_API_URL")))
                    .unwrap_or_else(|| DEFAULT_API_URL.to_string());
                ReviewSource::GitHub { api_url, token }
            }
        };

        Ok(Config {
            pull_request,
            policy: Policy::new(required_approvals, required_reviewers),
            source,
        })
    }
}

fn resolve_pull_request<F>(args: &Args, lookup: &F) -> Result<PullRequestId>
where
    F: Fn(&str) -> Option<String>,
{
    if let (Some(repo), Some(number)) = (&args.repo, args.pr) {
        let (owner, name) = parse_repo_slug(repo)?;
        return Ok(PullRequestId::new(owner, name, number));
    }

    let event_path = non_empty(lookup("GITHUB_EVENT_PATH")).context(
        "GITHUB_EVENT_PATH is not set; pass --repo and --pr when running outside GitHub Actions",
    )?;
    let payload = fs::read_to_string(&event_path)
        .with_context(|| format!("Failed to read event payload {}", event_path))?;
    let mut pull_request = pull_request_from_event(&payload)?;

    if let Some(repo) = &args.repo {
        let (owner, name) = parse_repo_slug(repo)?;
        pull_request.owner = owner;
        pull_request.repo = name;
    }
    if let Some(number) = args.pr {
        pull_request.number = number;
    }

    Ok(pull_request)
}

/// Extract the pull request a workflow run was triggered for.
pub fn pull_request_from_event(payload: &str) -> Result<PullRequestId> {
    let event: EventPayload =
        serde_json::from_str(payload).context("Failed to parse event payload as JSON")?;

    let repository = event
        .repository
        .ok_or_else(|| anyhow!("Event payload has no repository"))?;
    let pull_request = event.pull_request.ok_or_else(|| {
        anyhow!("Event payload has no pull_request; run this check on pull request events")
    })?;

    Ok(PullRequestId::new(
        repository.owner.login,
        repository.name,
        pull_request.number,
    ))
}

/// Environment variable the runner uses for an action input.
pub fn input_env_name(name: &str) -> String {
    format!("INPUT_{}", name.replace(' ', "_").to_uppercase())
}

/// Read an action input. Missing and blank inputs are both `None`.
pub fn get_input<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup(&input_env_name(name))).map(|v| v.trim().to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

pub fn parse_required_approvals(value: &str) -> Result<u32> {
    value.trim().parse::<u32>().with_context(|| {
        format!(
            "required-approvals must be a non-negative integer, got {:?}",
            value
        )
    })
}

/// Parse a comma- or newline-separated list of logins.
///
/// Leading `@` is stripped, blanks are dropped, and repeats (compared
/// case-insensitively) keep their first position.
pub fn parse_required_reviewers(value: &str) -> Vec<String> {
    let mut reviewers: Vec<String> = Vec::new();

    for entry in value.split([',', '\n']) {
        let login = entry.trim().trim_start_matches('@').trim();
        if login.is_empty() {
            continue;
        }
        if !reviewers.iter().any(|r| r.eq_ignore_ascii_case(login)) {
            reviewers.push(login.to_string());
        }
    }

    reviewers
}

pub fn parse_repo_slug(slug: &str) -> Result<(String, String)> {
    match slug.trim().split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((owner.to_string(), name.to_string()))
        }
        _ => bail!("--repo must be of the form owner/name, got {:?}", slug),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    const PULL_REQUEST_EVENT: &str = r#"{
        "action": "opened",
        "number": 17,
        "pull_request": { "number": 17, "title": "Add widgets" },
        "repository": { "name": "widgets", "owner": { "login": "octo" } }
    }"#;

    fn env_of(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn event_file(payload: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(payload.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_input_env_name() {
        assert_eq!(input_env_name("token"), "INPUT_TOKEN");
        assert_eq!(
            input_env_name("required-approvals"),
            "INPUT_REQUIRED-APPROVALS"
        );
        assert_eq!(input_env_name("my input"), "INPUT_MY_INPUT");
    }

    #[test]
    fn test_get_input_treats_blank_as_missing() {
        let env = env_of(&[("INPUT_TOKEN", "   "), ("INPUT_OTHER", " x ")]);
        let lookup = |name: &str| env.get(name).cloned();
        assert_eq!(get_input(&lookup, "token"), None);
        assert_eq!(get_input(&lookup, "other"), Some("x".to_string()));
        assert_eq!(get_input(&lookup, "missing"), None);
    }

    #[test]
    fn test_parse_required_reviewers() {
        assert_eq!(
            parse_required_reviewers("@alice, bob\ncarol,,  \nAlice"),
            vec!["alice", "bob", "carol"]
        );
        assert!(parse_required_reviewers("").is_empty());
    }

    #[test]
    fn test_parse_required_approvals() {
        assert_eq!(parse_required_approvals(" 2 ").unwrap(), 2);
        assert!(parse_required_approvals("-1").is_err());
        assert!(parse_required_approvals("two").is_err());
    }

    #[test]
    fn test_parse_repo_slug() {
        assert_eq!(
            parse_repo_slug("octo/widgets").unwrap(),
            ("octo".to_string(), "widgets".to_string())
        );
        assert!(parse_repo_slug("octo").is_err());
        assert!(parse_repo_slug("/widgets").is_err());
        assert!(parse_repo_slug("a/b/c").is_err());
    }

    #[test]
    fn test_pull_request_from_event() {
        let pr = pull_request_from_event(PULL_REQUEST_EVENT).unwrap();
        assert_eq!(pr, PullRequestId::new("octo", "widgets", 17));
    }

    #[test]
    fn test_push_event_is_rejected() {
        let err = pull_request_from_event(
            r#"{"ref": "refs/heads/main", "repository": {"name": "w", "owner": {"login": "o"}}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("no pull_request"));
    }

    #[test]
    fn test_resolve_from_actions_environment() {
        let event = event_file(PULL_REQUEST_EVENT);
        let env = env_of(&[
            ("GITHUB_EVENT_PATH", event.path().to_str().unwrap()),
            ("INPUT_TOKEN", "ghs_input"),
            ("GITHUB_TOKEN", "ghs_fallback"),
            ("INPUT_REQUIRED-APPROVALS", "2"),
            ("INPUT_REQUIRED-REVIEWERS", "alice, @bob"),
            ("GITHUB_API_URL", "https://ghe.example.com/api/v3"),
        ]);

        let config = Config::resolve(&Args::default(), |name| env.get(name).cloned()).unwrap();

        assert_eq!(config.pull_request, PullRequestId::new("octo", "widgets", 17));
        assert_eq!(
            config.policy,
            Policy::new(2, vec!["alice".to_string(), "bob".to_string()])
        );
        assert_eq!(
            config.source,
            ReviewSource::GitHub {
                api_url: "https://ghe.example.com/api/v3".to_string(),
                token: "ghs_input".to_string(),
            }
        );
    }

    #[test]
    fn test_resolve_defaults() {
        let event = event_file(PULL_REQUEST_EVENT);
        let env = env_of(&[
            ("GITHUB_EVENT_PATH", event.path().to_str().unwrap()),
            ("GITHUB_TOKEN", "ghs_fallback"),
        ]);

        let config = Config::resolve(&Args::default(), |name| env.get(name).cloned()).unwrap();

        assert_eq!(config.policy, Policy::default());
        assert_eq!(
            config.source,
            ReviewSource::GitHub {
                api_url: DEFAULT_API_URL.to_string(),
                token: "ghs_fallback".to_string(),
            }
        );
    }

    #[test]
    fn test_flags_override_environment() {
        let event = event_file(PULL_REQUEST_EVENT);
        let env = env_of(&[
            ("GITHUB_EVENT_PATH", event.path().to_str().unwrap()),
            ("INPUT_TOKEN", "ghs_input"),
            ("INPUT_REQUIRED-APPROVALS", "2"),
            ("INPUT_REQUIRED-REVIEWERS", "alice"),
        ]);
        let args = Args {
            pr: Some(99),
            token: Some("ghp_flag".to_string()),
            required_approvals: Some(0),
            required_reviewers: vec!["@carol".to_string()],
            ..Args::default()
        };

        let config = Config::resolve(&args, |name| env.get(name).cloned()).unwrap();

        assert_eq!(config.pull_request, PullRequestId::new("octo", "widgets", 99));
        assert_eq!(config.policy, Policy::new(0, vec!["carol".to_string()]));
        assert!(matches!(
            config.source,
            ReviewSource::GitHub { ref token, .. } if token == "ghp_flag"
        ));
    }

    #[test]
    fn test_resolve_without_actions_environment() {
        let args = Args {
            repo: Some("octo/widgets".to_string()),
            pr: Some(5),
            reviews_file: Some(PathBuf::from("reviews.json")),
            ..Args::default()
        };

        let config = Config::resolve(&args, |_| None).unwrap();

        assert_eq!(config.pull_request, PullRequestId::new("octo", "widgets", 5));
        assert_eq!(config.source, ReviewSource::File(PathBuf::from("reviews.json")));
    }

    #[test]
    fn test_missing_token_is_an_error() {
        let args = Args {
            repo: Some("octo/widgets".to_string()),
            pr: Some(5),
            ..Args::default()
        };

        let err = Config::resolve(&args, |_| None).unwrap_err();
        assert!(err.to_string().contains("No GitHub token"));
    }

    #[test]
    fn test_missing_event_path_is_an_error() {
        let err = Config::resolve(&Args::default(), |_| None).unwrap_err();
        assert!(err.to_string().contains("GITHUB_EVENT_PATH is not set"));
    }

    #[test]
    fn test_debug_output_redacts_token() {
        let source = ReviewSource::GitHub {
            api_url: DEFAULT_API_URL.to_string(),
            token: "ghs_secret_value".to_string(),
        };
        let config = Config {
            pull_request: PullRequestId::new("octo", "widgets", 1),
            policy: Policy::default(),
            source: source.clone(),
        };

        for rendered in [format!("{:?}", source), format!("{:?}", config)] {
            assert!(!rendered.contains("ghs_secret_value"), "{}", rendered);
            assert!(rendered.contains("[REDACTED]"), "{}", rendered);
            assert!(rendered.contains(DEFAULT_API_URL), "{}", rendered);
        }
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from([
            "reviewgate",
            "--repo",
            "octo/widgets",
            "--pr",
            "3",
            "--required-approvals",
            "2",
            "--required-reviewer",
            "alice",
            "--required-reviewer",
            "bob",
            "--verbose",
        ]);
        assert_eq!(args.repo.as_deref(), Some("octo/widgets"));
        assert_eq!(args.pr, Some(3));
        assert_eq!(args.required_approvals, Some(2));
        assert_eq!(args.required_reviewers, vec!["alice", "bob"]);
        assert!(args.verbose);
    }
}
