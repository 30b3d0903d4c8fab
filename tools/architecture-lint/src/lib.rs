//! Dependency guardrails for the fleet workspace.
//!
//! Each Rust source under the linted roots is parsed with `syn`, reduced to
//! the crates and backend layers it references, and checked against a fixed
//! rule table:
//!
//! - `document-schema` stays a pure, synchronous library: no async runtime,
//!   filesystem, logging, randomness or id generation.
//! - the backend `domain` never reaches the `inbound` or `outbound` adapters
//!   and never touches the filesystem, the CLI stack or configuration
//!   loading.
//! - `inbound` never reaches `outbound` and leaves the filesystem to the
//!   storage adapters; `outbound` never reaches `inbound` or the CLI stack.
//! - `rand` is used only by `domain::refid`, the one place that draws codes.
//!
//! Run it with `cargo run -p architecture-lint` from anywhere in the
//! workspace.

mod references;
mod rules;
mod walk;

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use references::Reference;
pub use rules::{RULES, Rule};

/// Source roots checked by [`check_workspace`], relative to the workspace.
pub const LINTED_ROOTS: [&str; 2] = ["backend/src", "backend/crates/document-schema/src"];

/// A Rust source file, addressed relative to the workspace root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Workspace-relative path such as `backend/src/domain/refid/mod.rs`.
    pub path: PathBuf,
    /// File contents.
    pub contents: String,
}

impl SourceFile {
    /// Convenience constructor for tests and tooling.
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

/// One rule broken by one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Workspace-relative path of the offending file.
    pub path: PathBuf,
    /// What the file referenced.
    pub reference: Reference,
    /// The broken rule's stated constraint.
    pub rule: &'static str,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} references {} ({})",
            self.path.display(),
            self.reference,
            self.rule
        )
    }
}

/// Failures reported by the lint.
#[derive(Debug, Error)]
pub enum LintError {
    /// Walking or reading the workspace failed.
    #[error("failed to read workspace sources: {0}")]
    Io(#[from] std::io::Error),
    /// A source file is not valid Rust.
    #[error("failed to parse {}: {message}", path.display())]
    Parse {
        /// Workspace-relative path.
        path: PathBuf,
        /// Parser message.
        message: String,
    },
    /// At least one rule was broken.
    #[error("{}", render_violations(.0))]
    Violations(Vec<Violation>),
}

fn render_violations(violations: &[Violation]) -> String {
    let mut rendered = format!("{} dependency rule violation(s):", violations.len());
    for violation in violations {
        rendered.push_str("\n- ");
        rendered.push_str(&violation.to_string());
    }
    rendered
}

/// Check every Rust file under [`LINTED_ROOTS`] of the workspace at `root`.
///
/// Missing roots are skipped.
///
/// # Errors
///
/// [`LintError::Io`] when a root cannot be walked, [`LintError::Parse`] for
/// invalid Rust and [`LintError::Violations`] when rules are broken.
pub fn check_workspace(root: &Path) -> Result<(), LintError> {
    let sources = walk::collect_sources(root, &LINTED_ROOTS)?;
    check_sources(&sources)
}

/// Check in-memory sources against [`RULES`].
///
/// # Errors
///
/// [`LintError::Parse`] for invalid Rust and [`LintError::Violations`] when
/// rules are broken.
pub fn check_sources(sources: &[SourceFile]) -> Result<(), LintError> {
    let mut violations = Vec::new();
    for source in sources {
        let applicable: Vec<&Rule> = RULES
            .iter()
            .filter(|rule| rule.applies_to(&source.path))
            .collect();
        if applicable.is_empty() {
            continue;
        }
        let parsed = syn::parse_file(&source.contents).map_err(|err| LintError::Parse {
            path: source.path.clone(),
            message: err.to_string(),
        })?;
        for reference in references::collect(&parsed) {
            violations.extend(
                applicable
                    .iter()
                    .filter(|rule| rule.forbids(&reference))
                    .map(|rule| Violation {
                        path: source.path.clone(),
                        reference: reference.clone(),
                        rule: rule.constraint,
                    }),
            );
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(LintError::Violations(violations))
    }
}

#[cfg(test)]
mod tests;
