use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a tracked issue.
///
/// `Locked` renders as open in checklists (a locked conversation is still
/// unfinished work) but is kept distinct so callers can filter on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Opened,
    Closed,
    Locked,
}

impl Status {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Opened => "opened",
            Self::Closed => "closed",
            Self::Locked => "locked",
        }
    }

    /// Map the remote representation (state string plus locked flag) to a
    /// `Status`. A closed issue stays `Closed` even when locked.
    #[must_use]
    pub fn from_remote(state: &str, locked: bool) -> Self {
        if state.eq_ignore_ascii_case("closed") {
            Self::Closed
        } else if locked {
            Self::Locked
        } else {
            Self::Opened
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tracked issue, possibly carrying an owned subtree of children.
///
/// The graph builder ([`crate::tree::Tree`]) is the only place children are
/// populated; the merge engine only reads them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub id: u64,
    pub title: String,
    pub body: String,
    pub status: Status,
    pub children: Vec<Issue>,
}

impl Issue {
    /// A flat issue with no children and an empty body slot filled in.
    #[must_use]
    pub fn new(id: u64, title: impl Into<String>, body: impl Into<String>, status: Status) -> Self {
        Self {
            id,
            title: title.into(),
            body: body.into(),
            status,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_opened(&self) -> bool {
        self.status == Status::Opened
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.status == Status::Closed
    }

    /// Render this issue as a checklist line with `indent` leading spaces.
    ///
    /// The trailing `#<id>` is the identity anchor the merge engine matches
    /// on; everything else on the line is display text.
    #[must_use]
    pub fn checklist_line(&self, indent: usize) -> String {
        let checkbox = if self.is_closed() { 'x' } else { ' ' };
        format!("{:indent$}- [{checkbox}] {} #{}", "", self.title, self.id)
    }
}
