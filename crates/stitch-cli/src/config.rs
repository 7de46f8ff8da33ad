//! Runtime configuration.
//!
//! stitch runs as a CI step, so every flag doubles as an `INPUT_*`
//! environment variable the way GitHub Actions pass their inputs. Numeric
//! and boolean inputs are parsed leniently: CI templates routinely hand
//! over empty or sloppy values, and a misconfigured input should fall back
//! to its default rather than fail the whole run.

use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use tracing::info;

const DEFAULT_SYNC_DAYS: i64 = 1;
const DEFAULT_MAX_LEVELS: usize = 0;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "stitch: keep parent-issue checklists in sync with their child issues",
    long_about = None
)]
pub struct Config {
    /// Repository to synchronize (<owner>/<repo>).
    #[arg(long, env = "INPUT_REPO", value_name = "OWNER/REPO")]
    pub repo: String,

    /// API token used for all requests.
    #[arg(long, env = "INPUT_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Only consider issues updated within the last N days; "all" disables
    /// the cutoff.
    #[arg(long, env = "INPUT_SYNC_DAYS", default_value = "1", value_parser = parse_sync_days)]
    pub sync_days: i64,

    /// Deepest checklist nesting level rendered; 0 means unlimited.
    #[arg(long, env = "INPUT_MAX_LEVELS", default_value = "0", value_parser = parse_max_levels)]
    pub max_levels: usize,

    /// Compute updates but write nothing back.
    #[arg(long, env = "INPUT_DRY_RUN", default_value = "false", value_parser = parse_flag)]
    pub dry_run: bool,

    /// Post the changelog as a comment on each updated issue.
    #[arg(long, env = "INPUT_ADD_CHANGELOG", default_value = "false", value_parser = parse_flag)]
    pub add_changelog: bool,

    /// Also refresh the checklist of parents that are already closed.
    #[arg(long, env = "INPUT_UPDATE_CLOSED", default_value = "false", value_parser = parse_flag)]
    pub update_closed: bool,
}

impl Config {
    /// The `updated_at` cutoff implied by `sync_days`, if any.
    #[must_use]
    pub fn since(&self) -> Option<DateTime<Utc>> {
        (self.sync_days > 0).then(|| Utc::now() - Duration::days(self.sync_days))
    }

    pub fn log_summary(&self) {
        info!(
            repo = %self.repo,
            sync_days = self.sync_days,
            max_levels = self.max_levels,
            dry_run = self.dry_run,
            add_changelog = self.add_changelog,
            update_closed = self.update_closed,
            "configuration"
        );
    }
}

/// `"all"` disables the window; anything unparseable falls back to the
/// default rather than aborting a CI run.
fn parse_sync_days(raw: &str) -> Result<i64, String> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("all") {
        return Ok(-1);
    }
    Ok(trimmed.parse().unwrap_or(DEFAULT_SYNC_DAYS))
}

fn parse_max_levels(raw: &str) -> Result<usize, String> {
    Ok(raw.trim().parse().unwrap_or(DEFAULT_MAX_LEVELS))
}

/// Truthy CI flag values: `1`, `true`, `y`, `yes` (any case).
fn parse_flag(raw: &str) -> Result<bool, String> {
    let lowered = raw.trim().to_ascii_lowercase();
    Ok(matches!(lowered.as_str(), "1" | "true" | "y" | "yes"))
}
