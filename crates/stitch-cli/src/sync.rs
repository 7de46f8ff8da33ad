//! One synchronization run, end to end.
//!
//! Fetch the repository's issues, build the parent-child tree, resolve
//! parents that were referenced but not fetched, then let the editor bring
//! every parent's checklist section up to date. Writes fan out on scoped
//! threads, one per updated parent: each parent's body is independent, so
//! there is nothing to order or share between them. A failed write is
//! logged and does not stop the others.

use std::thread;

use anyhow::{Context as _, Result};
use stitch_core::{Edit, Editor, Issue, Tree};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::github::{Client, RemoteIssue, RepoSlug};

/// Execute one full synchronization pass against the configured repository.
///
/// # Errors
///
/// Fails when the repository slug is malformed, the issue listing cannot be
/// fetched, or the issue tree cannot be built. Per-issue write failures are
/// logged and do not abort the run.
pub fn run(config: &Config) -> Result<()> {
    let repo = RepoSlug::parse(&config.repo)?;
    let client = Client::new(config.token.clone());

    let remote = client
        .list_issues(&repo, config.since())
        .context("failed to fetch repository issues")?;
    info!(count = remote.len(), "fetched issues");

    if remote.is_empty() {
        emit_action_output();
        return Ok(());
    }

    let items: Vec<Issue> = remote.into_iter().map(RemoteIssue::into_issue).collect();
    let mut tree = Tree::build(items).context("failed to build issue tree")?;

    let fetched = fetch_missing(&client, &repo, tree.missing());
    tree.add_parents(fetched);

    let parents = tree.issues().context("failed to materialize issue tree")?;
    let editor = Editor {
        max_levels: config.max_levels,
    };

    let mut updates: Vec<(&Issue, Edit)> = Vec::new();
    for parent in &parents {
        if !should_process(parent, config.update_closed) {
            debug!(issue = parent.id, status = %parent.status, "skipping issue");
            continue;
        }

        match editor.update(parent, true) {
            Ok(edit) => {
                if edit.body == parent.body {
                    debug!(issue = parent.id, "body already up to date");
                    continue;
                }
                updates.push((parent, edit));
            }
            Err(err) => {
                warn!(issue = parent.id, error = %err, "failed to update issue body");
            }
        }
    }

    info!(count = updates.len(), dry_run = config.dry_run, "pushing updates");
    if !config.dry_run {
        thread::scope(|scope| {
            let client = &client;
            let repo = &repo;
            for (parent, edit) in &updates {
                scope.spawn(move || push_update(client, repo, config, parent, edit));
            }
        });
    }

    emit_action_output();
    Ok(())
}

/// A parent qualifies when it is open, or closed with `update_closed` set.
/// Locked parents are left alone either way.
fn should_process(issue: &Issue, update_closed: bool) -> bool {
    issue.is_opened() || (issue.is_closed() && update_closed)
}

/// Fetch the parents the tree knows only by reference, one thread per ID.
/// Failures are logged and dropped; the tree skips unresolved parents.
fn fetch_missing(client: &Client, repo: &RepoSlug, ids: &[u64]) -> Vec<Issue> {
    if ids.is_empty() {
        return Vec::new();
    }
    info!(count = ids.len(), "fetching missing parent issues");

    thread::scope(|scope| {
        let handles: Vec<_> = ids
            .iter()
            .map(|&id| {
                scope.spawn(move || match client.issue(repo, id) {
                    Ok(remote) => Some(remote.into_issue()),
                    Err(err) => {
                        warn!(issue = id, error = %err, "failed to fetch parent issue");
                        None
                    }
                })
            })
            .collect();

        handles
            .into_iter()
            .filter_map(|handle| handle.join().unwrap_or(None))
            .collect()
    })
}

fn push_update(client: &Client, repo: &RepoSlug, config: &Config, issue: &Issue, edit: &Edit) {
    info!(issue = issue.id, "updating issue body");

    if let Err(err) = client.edit_body(repo, issue.id, &edit.body) {
        warn!(issue = issue.id, error = %err, "failed to edit issue");
        return;
    }

    if config.add_changelog
        && let Some(comment) = changelog_comment(&edit.changelog)
    {
        match client.create_comment(repo, issue.id, &comment) {
            Ok(()) => info!(issue = issue.id, "added changelog comment"),
            Err(err) => warn!(issue = issue.id, error = %err, "failed to add changelog comment"),
        }
    }
}

/// Render the editor's changelog as a comment body.
fn changelog_comment(changelog: &[String]) -> Option<String> {
    if changelog.is_empty() {
        return None;
    }

    let mut comment = String::from("Issue update changelog:\n");
    for entry in changelog {
        comment.push_str("- ");
        comment.push_str(entry);
        comment.push('\n');
    }
    Some(comment)
}

/// The workflow step downstream watches this output.
fn emit_action_output() {
    println!("::set-output name=updatedIssues::1");
}
