//! Parent-child graph construction from issue bodies.
//!
//! Issues declare their parent with a marker line anywhere in the body:
//!
//! ```text
//! Parent issue: #12
//! ```
//!
//! Recognized marker keywords are `parent issue`, `epic`, and `parent`
//! (case- and whitespace-insensitive). Only the first matching line in a
//! body is honored. [`Tree::build`] scans a flat collection of issues into
//! a parent-to-children edge map; [`Tree::issues`] then materializes one
//! [`Issue`] per parent, with the full child subtree attached.
//!
//! Parents referenced by a child but absent from the input set are reported
//! by [`Tree::missing`] so the caller can fetch them and register them via
//! [`Tree::add_parents`] before materializing.

#![allow(clippy::module_name_repetitions)]

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use thiserror::Error;
use tracing::debug;

use crate::model::Issue;

/// Marker keywords that declare a parent reference, lowercase.
const PARENT_MARKERS: [&str; 3] = ["parent issue", "epic", "parent"];

/// Errors from graph construction and materialization.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    /// An issue's body declares the issue itself as its parent.
    #[error("issue #{id} declares itself as its own parent")]
    SelfReference { id: u64 },
    /// The parent graph contains a reference cycle through `id`. The merge
    /// engine flattens subtrees without cycle protection, so this is
    /// rejected before any subtree is handed over.
    #[error("parent reference cycle detected through issue #{id}")]
    Cycle { id: u64 },
}

/// The parent-to-children graph over a flat set of issues.
#[derive(Debug)]
pub struct Tree {
    /// Parent ID to the set of its direct child IDs.
    nodes: BTreeMap<u64, BTreeSet<u64>>,
    /// Every known issue by ID, children not yet attached.
    issues: HashMap<u64, Issue>,
    /// Parent IDs referenced by some child but absent from `issues`.
    missing: Vec<u64>,
}

impl Tree {
    /// Scan `items` for parent markers and build the edge map.
    ///
    /// Items without a parseable marker are roots, not errors. Duplicate
    /// IDs in the input resolve to the last occurrence.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::SelfReference`] if an issue declares itself as
    /// its own parent.
    pub fn build(items: Vec<Issue>) -> Result<Self, TreeError> {
        let mut nodes: BTreeMap<u64, BTreeSet<u64>> = BTreeMap::new();
        let mut issues: HashMap<u64, Issue> = HashMap::with_capacity(items.len());

        for item in items {
            let child = item.id;
            let parent = parse_parent_marker(&item.body);
            issues.insert(child, item);

            let Some(parent) = parent else {
                debug!(issue = child, "no parent marker, treating as root");
                continue;
            };

            if parent == child {
                return Err(TreeError::SelfReference { id: child });
            }

            nodes.entry(parent).or_default().insert(child);
            debug!(parent, child, "added issue link");
        }

        let missing: Vec<u64> = nodes
            .keys()
            .filter(|id| !issues.contains_key(id))
            .copied()
            .collect();
        debug!(count = missing.len(), "collected missing parent issues");

        Ok(Self {
            nodes,
            issues,
            missing,
        })
    }

    /// Parent IDs referenced by a child but not present in the input set,
    /// sorted by ID.
    #[must_use]
    pub fn missing(&self) -> &[u64] {
        &self.missing
    }

    /// Register parents fetched for the IDs reported by [`Self::missing`].
    /// IDs already known are skipped.
    pub fn add_parents(&mut self, items: Vec<Issue>) {
        for item in items {
            if self.issues.contains_key(&item.id) {
                debug!(issue = item.id, "parent issue already registered");
                continue;
            }
            self.issues.insert(item.id, item);
        }
    }

    /// Materialize one issue per parent, children attached recursively and
    /// ordered by ID.
    ///
    /// Child IDs with no known issue are skipped, as are parent IDs still
    /// unresolved after the missing-parent pass. Parents whose children all
    /// turn out unresolvable are omitted. Output order is ascending by
    /// parent ID, so repeated runs over the same input are stable.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Cycle`] if the parent graph loops.
    pub fn issues(&self) -> Result<Vec<Issue>, TreeError> {
        let mut out = Vec::with_capacity(self.nodes.len());

        for &parent_id in self.nodes.keys() {
            let Some(parent) = self.issues.get(&parent_id) else {
                debug!(issue = parent_id, "parent issue unresolved, skipping");
                continue;
            };

            let mut path = HashSet::new();
            let materialized = self.materialize(parent, &mut path)?;
            if materialized.children.is_empty() {
                debug!(issue = parent_id, "no resolvable children, skipping");
                continue;
            }
            out.push(materialized);
        }

        debug!(count = out.len(), "materialized parent issues");
        Ok(out)
    }

    /// Clone `base` and attach its child subtrees. `path` holds the IDs of
    /// the ancestors currently being built, for cycle detection.
    fn materialize(&self, base: &Issue, path: &mut HashSet<u64>) -> Result<Issue, TreeError> {
        if !path.insert(base.id) {
            return Err(TreeError::Cycle { id: base.id });
        }

        let mut issue = base.clone();
        if let Some(child_ids) = self.nodes.get(&base.id) {
            for &child_id in child_ids {
                let Some(child) = self.issues.get(&child_id) else {
                    debug!(issue = child_id, "child issue not found, skipping");
                    continue;
                };
                issue.children.push(self.materialize(child, path)?);
            }
        }

        path.remove(&base.id);
        Ok(issue)
    }
}

/// Find the first parent declaration in a body.
///
/// A declaration is a line `<marker>: #<id>` with exactly one colon, where
/// the left side trims to a recognized keyword and the right side trims to
/// `#` followed by nothing but decimal digits. Lines that look like a
/// declaration but fail to parse are skipped and the scan continues.
fn parse_parent_marker(body: &str) -> Option<u64> {
    for line in body.lines() {
        if !line.contains('#') {
            continue;
        }

        let Some((left, right)) = line.split_once(':') else {
            continue;
        };
        if right.contains(':') {
            continue;
        }

        if !is_parent_keyword(left) {
            continue;
        }

        match parse_issue_ref(right) {
            Some(id) => return Some(id),
            None => {
                debug!(line, "failed to parse parent reference");
            }
        }
    }

    None
}

fn is_parent_keyword(raw: &str) -> bool {
    let keyword = raw.trim().to_ascii_lowercase();
    PARENT_MARKERS.contains(&keyword.as_str())
}

/// Parse `#<digits>` (surrounding whitespace allowed, nothing else).
fn parse_issue_ref(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix('#')?;
    digits.parse().ok()
}
