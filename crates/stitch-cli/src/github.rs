//! Minimal blocking client for the GitHub issues REST API.
//!
//! Covers exactly what synchronization needs: list a repository's issues
//! (paginated, optionally bounded by an `updated_at` cutoff), fetch a single
//! issue by number, replace an issue body, and post a comment.

use anyhow::{Context as _, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use stitch_core::{Issue, Status};
use tracing::debug;

const API_ROOT: &str = "https://api.github.com";
const PER_PAGE: usize = 100;

/// `<owner>/<repo>` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub repo: String,
}

impl RepoSlug {
    /// Parse an `<owner>/<repo>` slug.
    ///
    /// # Errors
    ///
    /// Fails when either side of the slash is missing.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let Some((owner, repo)) = trimmed.split_once('/') else {
            anyhow::bail!("invalid repo slug '{trimmed}': expected <owner>/<repo>");
        };

        if owner.is_empty() || repo.is_empty() {
            anyhow::bail!("invalid repo slug '{trimmed}': expected <owner>/<repo>");
        }

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }
}

/// An issue as the API returns it. The issues endpoints also return pull
/// requests; those carry a `pull_request` key and are filtered out.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteIssue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub state: String,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

impl RemoteIssue {
    #[must_use]
    pub const fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    /// Convert into the engine's flat [`Issue`] (no children attached).
    #[must_use]
    pub fn into_issue(self) -> Issue {
        let status = Status::from_remote(&self.state, self.locked);
        Issue::new(self.number, self.title, self.body.unwrap_or_default(), status)
    }
}

/// Blocking GitHub API client.
pub struct Client {
    token: String,
}

impl Client {
    #[must_use]
    pub const fn new(token: String) -> Self {
        Self { token }
    }

    /// List all issues of `repo` (open and closed), newest pages until a
    /// short page. Pull requests are filtered out.
    ///
    /// # Errors
    ///
    /// Fails when a request or response decode fails.
    pub fn list_issues(
        &self,
        repo: &RepoSlug,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RemoteIssue>> {
        let mut issues = Vec::new();
        let mut page = 1_u32;

        let since_param = since.map_or_else(String::new, |cutoff| {
            format!("&since={}", cutoff.to_rfc3339_opts(SecondsFormat::Secs, true))
        });

        loop {
            let url = format!(
                "{API_ROOT}/repos/{}/{}/issues?state=all&per_page={PER_PAGE}&page={page}{since_param}",
                repo.owner, repo.repo
            );

            let batch: Vec<RemoteIssue> = self
                .get_json(&url)
                .with_context(|| format!("failed to fetch issues page {page}"))?;

            if batch.is_empty() {
                break;
            }

            let raw_len = batch.len();
            issues.extend(batch.into_iter().filter(|issue| !issue.is_pull_request()));

            if raw_len < PER_PAGE {
                break;
            }

            page += 1;
        }

        debug!(count = issues.len(), "listed repository issues");
        Ok(issues)
    }

    /// Fetch one issue by number.
    ///
    /// # Errors
    ///
    /// Fails when the request or response decode fails.
    pub fn issue(&self, repo: &RepoSlug, number: u64) -> Result<RemoteIssue> {
        let url = format!(
            "{API_ROOT}/repos/{}/{}/issues/{number}",
            repo.owner, repo.repo
        );
        self.get_json(&url)
            .with_context(|| format!("failed to fetch issue #{number}"))
    }

    /// Replace the body of an issue.
    ///
    /// # Errors
    ///
    /// Fails when the request fails.
    pub fn edit_body(&self, repo: &RepoSlug, number: u64, body: &str) -> Result<()> {
        let url = format!(
            "{API_ROOT}/repos/{}/{}/issues/{number}",
            repo.owner, repo.repo
        );
        self.request("PATCH", &url)
            .send_json(json!({ "body": body }))
            .map_err(|err| anyhow::anyhow!("failed to edit issue #{number}: {err}"))?;
        Ok(())
    }

    /// Post a comment on an issue.
    ///
    /// # Errors
    ///
    /// Fails when the request fails.
    pub fn create_comment(&self, repo: &RepoSlug, number: u64, body: &str) -> Result<()> {
        let url = format!(
            "{API_ROOT}/repos/{}/{}/issues/{number}/comments",
            repo.owner, repo.repo
        );
        self.request("POST", &url)
            .send_json(json!({ "body": body }))
            .map_err(|err| anyhow::anyhow!("failed to comment on issue #{number}: {err}"))?;
        Ok(())
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .request("GET", url)
            .call()
            .map_err(|err| anyhow::anyhow!("GitHub API request failed for {url}: {err}"))?;

        response
            .into_json::<T>()
            .context("failed to decode GitHub API JSON response")
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        ureq::request(method, url)
            .set("Accept", "application/vnd.github+json")
            .set("User-Agent", "stitch")
            .set("Authorization", &format!("Bearer {}", self.token))
    }
}
