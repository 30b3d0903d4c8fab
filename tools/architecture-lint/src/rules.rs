//! The workspace dependency rules.

use std::path::{Component, Path};

use crate::references::Reference;

/// A constraint on what files under one part of the workspace may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    /// Workspace-relative directory the rule covers.
    pub scope: &'static str,
    /// Directories inside `scope` the rule skips.
    pub exempt: &'static [&'static str],
    /// External crates the scope may not use.
    pub banned_crates: &'static [&'static str],
    /// Backend layers the scope may not reach.
    pub banned_layers: &'static [&'static str],
    /// The constraint, as reported to the user.
    pub constraint: &'static str,
}

/// Every rule the lint enforces.
pub const RULES: &[Rule] = &[
    Rule {
        scope: "backend/crates/document-schema/src",
        exempt: &[],
        banned_crates: &[
            "async_trait",
            "cap_std",
            "mockable",
            "rand",
            "tempfile",
            "tokio",
            "tracing",
            "uuid",
        ],
        banned_layers: &[],
        constraint: "document-schema is pure and synchronous",
    },
    Rule {
        scope: "backend/src/domain",
        exempt: &[],
        banned_crates: &[
            "cap_std",
            "clap",
            "ortho_config",
            "tempfile",
            "tracing_subscriber",
            "uuid",
        ],
        banned_layers: &["inbound", "outbound", "config"],
        constraint: "the domain depends only on its ports",
    },
    Rule {
        scope: "backend/src/inbound",
        exempt: &[],
        banned_crates: &["cap_std", "tempfile"],
        banned_layers: &["outbound"],
        constraint: "inbound adapters drive the domain, not storage",
    },
    Rule {
        scope: "backend/src/outbound",
        exempt: &[],
        banned_crates: &["clap", "ortho_config"],
        banned_layers: &["inbound"],
        constraint: "outbound adapters never see the command line",
    },
    Rule {
        scope: "backend/src",
        exempt: &["backend/src/domain/refid"],
        banned_crates: &["rand"],
        banned_layers: &[],
        constraint: "reference codes are drawn only in domain::refid",
    },
];

impl Rule {
    /// Whether `path` falls inside the scope and outside every exemption.
    pub fn applies_to(&self, path: &Path) -> bool {
        within(path, self.scope) && !self.exempt.iter().any(|dir| within(path, dir))
    }

    /// Whether this rule bans `reference`.
    pub fn forbids(&self, reference: &Reference) -> bool {
        match reference {
            Reference::Crate(name) => self.banned_crates.contains(&name.as_str()),
            Reference::Layer(name) => self.banned_layers.contains(&name.as_str()),
        }
    }
}

/// Component-wise prefix test, independent of the platform separator.
fn within(path: &Path, dir: &str) -> bool {
    let mut components = path.components().filter_map(|component| match component {
        Component::Normal(part) => part.to_str(),
        _ => None,
    });
    dir.split('/')
        .all(|expected| components.next() == Some(expected))
}
