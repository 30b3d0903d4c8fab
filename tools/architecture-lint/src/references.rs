//! Reduce a parsed file to the crates and backend layers it names.

use std::collections::BTreeSet;
use std::fmt;

use syn::visit::{self, Visit};

/// Library name of the backend crate in absolute paths.
const BACKEND_CRATE: &str = "fleet_backend";

/// Something a source file depends on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Reference {
    /// An external crate, by its root path segment.
    Crate(String),
    /// A top-level backend module reached through `crate::` or
    /// `fleet_backend::`.
    Layer(String),
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Crate(name) => write!(f, "crate `{name}`"),
            Self::Layer(name) => write!(f, "backend layer `{name}`"),
        }
    }
}

/// Every reference made by `file`, sorted and deduplicated.
pub(crate) fn collect(file: &syn::File) -> BTreeSet<Reference> {
    let mut collector = Collector::default();
    collector.visit_file(file);
    collector.found
}

#[derive(Default)]
struct Collector {
    found: BTreeSet<Reference>,
}

impl Collector {
    /// Record the reference implied by a path's leading segments.
    ///
    /// Single-segment paths in expressions and types name local items, so
    /// only `use` trees count them.
    fn record(&mut self, head: &str, next: Option<&str>, from_use: bool) {
        let reference = match (head, next) {
            ("crate" | BACKEND_CRATE, Some(module)) => Reference::Layer(module.to_owned()),
            ("crate" | "self" | "super" | "Self" | BACKEND_CRATE, _) => return,
            (name, Some(_)) => Reference::Crate(name.to_owned()),
            (name, None) if from_use => Reference::Crate(name.to_owned()),
            (_, None) => return,
        };
        self.found.insert(reference);
    }

    fn record_use(&mut self, tree: &syn::UseTree, head: Option<&str>) {
        match tree {
            syn::UseTree::Path(path) => {
                let ident = path.ident.to_string();
                match head {
                    None => self.record_use(&path.tree, Some(&ident)),
                    Some(root) => self.record(root, Some(&ident), true),
                }
            }
            syn::UseTree::Name(syn::UseName { ident })
            | syn::UseTree::Rename(syn::UseRename { ident, .. }) => {
                let ident = ident.to_string();
                match head {
                    None => self.record(&ident, None, true),
                    Some(root) => self.record(root, Some(&ident), true),
                }
            }
            syn::UseTree::Glob(_) => {
                if let Some(root) = head {
                    self.record(root, None, true);
                }
            }
            syn::UseTree::Group(group) => {
                for item in &group.items {
                    self.record_use(item, head);
                }
            }
        }
    }
}

impl<'ast> Visit<'ast> for Collector {
    fn visit_item_use(&mut self, node: &'ast syn::ItemUse) {
        self.record_use(&node.tree, None);
    }

    fn visit_item_extern_crate(&mut self, node: &'ast syn::ItemExternCrate) {
        self.record(&node.ident.to_string(), None, true);
    }

    fn visit_path(&mut self, node: &'ast syn::Path) {
        let mut segments = node.segments.iter().map(|segment| segment.ident.to_string());
        if let Some(head) = segments.next() {
            let next = segments.next();
            self.record(&head, next.as_deref(), false);
        }
        visit::visit_path(self, node);
    }
}
