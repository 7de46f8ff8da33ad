//! Checklist section rendering and merging.
//!
//! The editor owns the generated `### Child issues:` block inside a parent
//! issue's body. [`Editor::update`] either appends a freshly rendered block
//! (no section yet) or merges the child tree into the existing section line
//! by line. The merge is deliberately conservative: only lines that parse
//! as a `#<id>` reference to a known child are rewritten, and only their
//! checkbox, title, and indentation ever change. Everything else — prose,
//! blank separators, references to issues outside the subtree, lines below
//! the configured depth — passes through verbatim.
//!
//! The merge keeps an explicit stack of the ancestors implied by the
//! indentation of the lines scanned so far. When `add_missing` is on, a
//! popped ancestor flushes any of its children that never appeared in the
//! section, so new child issues show up nested under their parent's last
//! rendered line.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

use thiserror::Error;
use tracing::debug;

use crate::model::Issue;

/// Fixed header of the generated section. The merge anchors on the last
/// occurrence, so the same text earlier in user prose is left alone.
pub const SECTION_HEADER: &str = "### Child issues:";

const SPACES_PER_LEVEL: usize = 2;

/// Error from a synchronization pass. Skip conditions during recursive
/// rendering (duplicate IDs, depth bound) are absorbed internally and never
/// surface here; only a failing output sink aborts the pass.
#[derive(Debug, Error)]
pub enum EditError {
    #[error("failed to write rendered section: {0}")]
    Sink(#[from] std::fmt::Error),
}

/// Result of one [`Editor::update`] pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// The full new body, section included.
    pub body: String,
    /// Ordered, human-readable reasons the body changed. Empty when the
    /// pass was a no-op.
    pub changelog: Vec<String>,
}

/// Outcome of rendering one subtree root during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rendered {
    Written,
    /// The root's ID was already rendered earlier in this pass.
    Duplicate,
    /// The root sits at or beyond the configured depth bound.
    TooDeep,
}

/// One ancestor implied by the indentation scanned so far. The parent
/// itself is the sentinel frame with `level: None`, below any real line.
#[derive(Debug, Clone, Copy)]
struct Frame<'a> {
    issue: &'a Issue,
    level: Option<usize>,
}

impl Frame<'_> {
    /// The level a flushed child of this frame renders at.
    fn child_level(&self) -> usize {
        self.level.map_or(0, |l| l + 1)
    }
}

/// Pass-local merge state, discarded when `update` returns.
struct MergeCtx<'a> {
    changelog: Vec<String>,
    /// IDs rendered in this pass, whether matched in the section or flushed
    /// as missing. Guarantees each ID appears at most once per block.
    processed: HashSet<u64>,
    stack: Vec<Frame<'a>>,
}

/// The section merge engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct Editor {
    /// Number of nesting levels rendered and accepted; 0 means unlimited.
    /// Lines at or beyond the bound are never reformatted.
    pub max_levels: usize,
}

impl Editor {
    /// Synchronize the generated section of `issue` with its children.
    ///
    /// Returns the new body and a changelog of observable changes. An issue
    /// with no children is a no-op: the body comes back unchanged with an
    /// empty changelog. The engine never mutates `issue`.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::Sink`] if writing the rendered section fails.
    pub fn update(&self, issue: &Issue, add_missing: bool) -> Result<Edit, EditError> {
        if issue.children.is_empty() {
            return Ok(Edit {
                body: issue.body.clone(),
                changelog: Vec::new(),
            });
        }

        match issue.body.rfind(SECTION_HEADER) {
            None => self.append_section(issue),
            Some(pos) => self.merge_section(issue, pos + SECTION_HEADER.len(), add_missing),
        }
    }

    /// Append mode: no section yet, render the whole child tree.
    fn append_section(&self, issue: &Issue) -> Result<Edit, EditError> {
        let mut section = format!("{SECTION_HEADER}\n\n");
        let mut rendered = HashSet::new();

        for child in &issue.children {
            let _ = self.render_subtree(child, 0, &mut section, &mut rendered)?;
        }

        let body = if issue.body.is_empty() {
            section
        } else {
            format!(
                "{}\n\n{section}",
                issue.body.trim_end_matches([' ', '\n', '\t'])
            )
        };

        let changelog = vec![format!(
            "Appended new block with {} child issue(s)",
            issue.children.len()
        )];

        Ok(Edit { body, changelog })
    }

    /// Merge mode: rewrite the section text after the header, line by line.
    /// `start` is the byte offset just past the header.
    fn merge_section(
        &self,
        issue: &Issue,
        start: usize,
        add_missing: bool,
    ) -> Result<Edit, EditError> {
        let (head, tail) = issue.body.split_at(start);

        let mut index = HashMap::new();
        flatten(issue, &mut index);

        let mut out = String::with_capacity(tail.len());
        let mut ctx = MergeCtx {
            changelog: Vec::new(),
            processed: HashSet::new(),
            stack: vec![Frame { issue, level: None }],
        };

        for line in tail.lines() {
            if line.trim().is_empty() {
                out.push_str(line);
                out.push('\n');
                continue;
            }

            let spaces = leading_whitespace(line);
            let level = spaces / SPACES_PER_LEVEL;

            if self.max_levels > 0 && level >= self.max_levels {
                debug!(line, max_levels = self.max_levels, "line below depth bound");
                out.push_str(line);
                out.push('\n');
                continue;
            }

            let Some(id) = parse_line_ref(line) else {
                out.push_str(line);
                out.push('\n');
                continue;
            };

            if add_missing {
                // The line dedented past one or more ancestors: their
                // subtrees just ended, flush whatever children of theirs
                // the section never listed.
                while ctx.stack.last().is_some_and(|f| f.level >= Some(level)) {
                    if let Some(frame) = ctx.stack.pop() {
                        self.flush_missing(frame, &mut out, &mut ctx)?;
                    }
                }
            }

            let Some(child) = index.get(&id).copied() else {
                debug!(id, "reference to an issue outside this subtree");
                out.push_str(line);
                out.push('\n');
                continue;
            };

            ctx.stack.push(Frame {
                issue: child,
                level: Some(level),
            });
            ctx.processed.insert(id);

            let rendered = child.checklist_line(spaces);
            if rendered != line {
                let status = if child.is_closed() { "closed" } else { "opened" };
                ctx.changelog
                    .push(format!("Updated child issue #{id}. New status: {status}"));
            }
            out.push_str(&rendered);
            out.push('\n');
        }

        if add_missing {
            while let Some(frame) = ctx.stack.pop() {
                self.flush_missing(frame, &mut out, &mut ctx)?;
            }
        }

        Ok(Edit {
            body: format!("{head}{out}"),
            changelog: ctx.changelog,
        })
    }

    /// Render the children of a popped ancestor that the section never
    /// listed, one level below the ancestor's own line.
    fn flush_missing(
        &self,
        frame: Frame<'_>,
        out: &mut String,
        ctx: &mut MergeCtx<'_>,
    ) -> Result<(), EditError> {
        let level = frame.child_level();
        let mut added = 0;

        for child in &frame.issue.children {
            if self.render_subtree(child, level, out, &mut ctx.processed)? == Rendered::Written {
                added += 1;
            }
        }

        if added > 0 {
            debug!(parent = frame.issue.id, added, level, "appended missing children");
            ctx.changelog
                .push(format!("Appended {added} new child issue(s) on level {level}"));
        }

        Ok(())
    }

    /// Recursively render `issue` and its descendants as checklist lines.
    ///
    /// Duplicate IDs and subtrees at or beyond the depth bound are skipped
    /// silently; the skip outcome is reported so callers can count actual
    /// insertions. Descendant skips are absorbed here and do not stop their
    /// siblings from rendering.
    fn render_subtree(
        &self,
        issue: &Issue,
        level: usize,
        out: &mut String,
        rendered: &mut HashSet<u64>,
    ) -> Result<Rendered, EditError> {
        if self.max_levels > 0 && level >= self.max_levels {
            debug!(issue = issue.id, level, "subtree below depth bound, skipping");
            return Ok(Rendered::TooDeep);
        }

        if !rendered.insert(issue.id) {
            debug!(issue = issue.id, "already rendered in this pass, skipping");
            return Ok(Rendered::Duplicate);
        }

        writeln!(out, "{}", issue.checklist_line(level * SPACES_PER_LEVEL))?;

        for child in &issue.children {
            let _ = self.render_subtree(child, level + 1, out, rendered)?;
        }

        Ok(Rendered::Written)
    }
}

/// Index the whole subtree rooted at `issue` by ID, root included. When an
/// ID appears at multiple positions the occurrence flattened last wins.
fn flatten<'a>(issue: &'a Issue, index: &mut HashMap<u64, &'a Issue>) {
    index.insert(issue.id, issue);
    for child in &issue.children {
        flatten(child, index);
    }
}

fn leading_whitespace(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

/// Parse the trailing `#<id>` reference of a checklist line.
fn parse_line_ref(line: &str) -> Option<u64> {
    let hash = line.rfind('#')?;
    line[hash + 1..].trim().parse().ok()
}
