//! The narrow slice of a compiler's intermediate representation the
//! annotator actually needs: statements with a source location and an
//! (optional) enclosing lexical scope.
//!
//! The real IR and its traversal primitives are out of scope for this
//! crate — a host compiler walks its own instructions and lexical-block
//! tree and hands the annotator [`Statement`]s and a [`ScopeTree`]. The
//! types here are deliberately minimal, in the spirit of the small
//! self-contained IR fixtures `cranelift-codegen` builds directly in its own
//! test modules (e.g. `flowgraph.rs`'s `Function::new()` + a handful of
//! `dfg`/`layout` calls) rather than a general-purpose IR of their own.

use cranelift_entity::PrimaryMap;

use crate::entities::{FileId, Scope};

/// One node of a lexical-block tree: the location this scope was expanded
/// from (the inlining call site, or `None` if the location is unknown/zero —
/// spec calls out that a zero location must be treated as "skip this
/// frame", not as ending the walk early), and a link to the enclosing
/// scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopeNode {
    /// The enclosing lexical scope, if any.
    pub parent: Option<Scope>,
    /// The source location this scope expands from.
    pub loc: Option<(FileId, u32)>,
}

/// The lexical-block tree for one function, as the [`crate::inline_stack`]
/// extractor walks it. Scopes are only ever appended; a `Function` owns
/// exactly one `ScopeTree` for its whole lifetime.
#[derive(Default)]
pub struct ScopeTree {
    nodes: PrimaryMap<Scope, ScopeNode>,
}

impl ScopeTree {
    /// Create an empty scope tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new scope nested inside `parent`, with the given expansion
    /// location, returning its reference.
    pub fn push(&mut self, parent: Option<Scope>, loc: Option<(FileId, u32)>) -> Scope {
        self.nodes.push(ScopeNode { parent, loc })
    }

    /// The scope enclosing `scope`, if any.
    pub fn parent(&self, scope: Scope) -> Option<Scope> {
        self.nodes[scope].parent
    }

    /// The expansion location attached to `scope`.
    pub fn loc(&self, scope: Scope) -> Option<(FileId, u32)> {
        self.nodes[scope].loc
    }
}

/// One IR statement as the annotator sees it: its own source location (if
/// known — `None` corresponds to spec's "line is unknown (-1)" case) and
/// the innermost lexical scope it sits in, if it was produced by inlining.
#[derive(Debug, Clone, Copy, Default)]
pub struct Statement {
    /// This statement's own source location.
    pub loc: Option<(FileId, u32)>,
    /// The innermost lexical scope enclosing this statement, or `None` if
    /// it was not produced by inlining.
    pub scope: Option<Scope>,
}

impl Statement {
    /// Build a statement at `loc` with no enclosing scope (not the product
    /// of inlining).
    pub fn at(loc: (FileId, u32)) -> Self {
        Self {
            loc: Some(loc),
            scope: None,
        }
    }

    /// Build a statement at `loc`, nested inside `scope`.
    pub fn inlined_at(loc: (FileId, u32), scope: Scope) -> Self {
        Self {
            loc: Some(loc),
            scope: Some(scope),
        }
    }

    /// A statement whose source line is unknown; always skipped by the
    /// annotator.
    pub fn unknown() -> Self {
        Self {
            loc: None,
            scope: None,
        }
    }
}
