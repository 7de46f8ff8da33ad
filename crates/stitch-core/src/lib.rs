#![forbid(unsafe_code)]
//! stitch-core library.
//!
//! Builds a parent-child graph from parent markers scattered through issue
//! bodies, and keeps the generated `### Child issues:` checklist section of
//! each parent's body in sync with the live state of its children.
//!
//! # Conventions
//!
//! - **Errors**: Domain errors are concrete enums ([`TreeError`],
//!   [`EditError`]); recoverable render skips never surface.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`,
//!   `debug!`, `trace!`).

pub mod editor;
pub mod model;
pub mod tree;

pub use editor::{Edit, EditError, Editor, SECTION_HEADER};
pub use model::{Issue, Status};
pub use tree::{Tree, TreeError};
