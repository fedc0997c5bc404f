//! Reconstructs a statement's inline stack by walking its lexical-scope
//! ancestry, per spec §4.3.

use smallvec::SmallVec;

use crate::entities::FuncId;
use crate::index::{SampleIndex, StackFrame};
use crate::ir::{Scope, ScopeTree, Statement};

/// Most inline stacks this annotator resolves are only a few frames deep
/// (a handful of nested call sites); stacks deeper than this still work,
/// they just spill to the heap like any other `SmallVec`.
const TYPICAL_DEPTH: usize = 8;

/// An inline stack as reconstructed by [`extract_stack`]/
/// [`extract_total_count_stack`], inline-allocated up to [`TYPICAL_DEPTH`]
/// frames.
pub type InlineStack = SmallVec<[StackFrame; TYPICAL_DEPTH]>;

/// Reconstruct the inline stack for `stmt`: the ordered `(file, line)`
/// frames representing the inlining path from the outermost call site down
/// to `stmt`, outermost-first (matching [`crate::index::SampleIndex`]'s
/// storage order).
///
/// Walks `stmt`'s innermost enclosing scope and upward. A scope with no
/// location (spec's "zero" case) or whose location repeats the
/// previously-emitted one is skipped rather than ending the walk — per
/// spec's explicit instruction not to replicate the source's
/// operator-precedence bug that would otherwise stop the walk early on a
/// zero location.
pub fn extract_stack(scopes: &ScopeTree, stmt: &Statement) -> InlineStack {
    walk(scopes, stmt.scope, None)
}

/// Reconstruct the stack used to look up a callsite-total entry for the
/// inlined invocation `stmt` is a part of (or is itself a call to).
///
/// Spec §4.3: the statement's own location is prepended as frame 0 and the
/// walk begins from the same innermost enclosing scope as [`extract_stack`];
/// the resulting key is looked up with `line = 0`.
pub fn extract_total_count_stack(scopes: &ScopeTree, stmt: &Statement) -> InlineStack {
    walk(scopes, stmt.scope, stmt.loc)
}

/// Look up the total sampled count for the inlined invocation `stmt` belongs
/// to: reconstructs the callsite-total stack ([`extract_total_count_stack`])
/// and resolves it against `index` with `line = 0` (spec §4.3/§4.4's
/// "callsite total" lookup), attributed to `func` (the enclosing
/// `Function`'s name, matching how [`crate::annotate`] resolves every other
/// lookup). Returns `None` if `stmt` has no location or no such invocation
/// was sampled.
pub fn get_total_count(
    index: &SampleIndex,
    scopes: &ScopeTree,
    stmt: &Statement,
    func: FuncId,
) -> Option<i64> {
    let (file, _line) = stmt.loc?;
    let stack = extract_total_count_stack(scopes, stmt);
    index.find_inline(&stack, file, 0, func).map(|e| e.freq)
}

fn walk(scopes: &ScopeTree, start: Option<Scope>, seed: Option<StackFrame>) -> InlineStack {
    let mut innermost_first: InlineStack = SmallVec::new();
    let mut last = None;

    if let Some(loc) = seed {
        innermost_first.push(loc);
        last = Some(loc);
    }

    let mut cur = start;
    while let Some(scope) = cur {
        if let Some(loc) = scopes.loc(scope) {
            if Some(loc) != last {
                innermost_first.push(loc);
                last = Some(loc);
            }
        }
        cur = scopes.parent(scope);
    }

    innermost_first.reverse();
    innermost_first
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::FileId;
    use crate::strtab::StringInterner;

    fn fid(interner: &mut StringInterner, name: &str) -> FileId {
        interner.intern_file(name)
    }

    #[test]
    fn depth_zero_for_uninlined_statement() {
        let interner = StringInterner::new();
        let scopes = ScopeTree::new();
        let stmt = Statement::at((FileId::new(0), 10));
        let stack = extract_stack(&scopes, &stmt);
        assert!(stack.is_empty());
        let _ = interner;
    }

    #[test]
    fn s3_two_frame_stack() {
        let mut interner = StringInterner::new();
        let a_c = fid(&mut interner, "a.c");
        let b_c = fid(&mut interner, "b.c");

        let mut scopes = ScopeTree::new();
        let outer = scopes.push(None, Some((a_c, 42)));
        let inner = scopes.push(Some(outer), Some((b_c, 7)));

        let stmt = Statement::inlined_at((b_c, 7), inner);
        let stack = extract_stack(&scopes, &stmt);
        assert_eq!(stack.as_slice(), &[(a_c, 42), (b_c, 7)]);
    }

    #[test]
    fn zero_location_is_skipped_not_a_stop() {
        let mut interner = StringInterner::new();
        let a_c = fid(&mut interner, "a.c");
        let b_c = fid(&mut interner, "b.c");

        let mut scopes = ScopeTree::new();
        let outer = scopes.push(None, Some((a_c, 42)));
        let zero = scopes.push(Some(outer), None);
        let inner = scopes.push(Some(zero), Some((b_c, 7)));

        let stmt = Statement::inlined_at((b_c, 7), inner);
        let stack = extract_stack(&scopes, &stmt);
        assert_eq!(stack.as_slice(), &[(a_c, 42), (b_c, 7)]);
    }

    #[test]
    fn duplicate_consecutive_locations_collapse() {
        let mut interner = StringInterner::new();
        let a_c = fid(&mut interner, "a.c");

        let mut scopes = ScopeTree::new();
        let outer = scopes.push(None, Some((a_c, 42)));
        let dup = scopes.push(Some(outer), Some((a_c, 42)));

        let stmt = Statement::inlined_at((a_c, 42), dup);
        let stack = extract_stack(&scopes, &stmt);
        assert_eq!(stack.as_slice(), &[(a_c, 42)]);
    }

    #[test]
    fn total_count_stack_prepends_statement_location() {
        let mut interner = StringInterner::new();
        let a_c = fid(&mut interner, "a.c");
        let b_c = fid(&mut interner, "b.c");

        let mut scopes = ScopeTree::new();
        let outer = scopes.push(None, Some((a_c, 42)));

        // A call statement at b.c:7 that is not itself inlined, but whose
        // enclosing scope chain leads back through `outer`.
        let stmt = Statement::inlined_at((b_c, 7), outer);
        let stack = extract_total_count_stack(&scopes, &stmt);
        assert_eq!(stack.as_slice(), &[(a_c, 42), (b_c, 7)]);
    }

    #[test]
    fn get_total_count_resolves_callsite_total_end_to_end() {
        use crate::index::{InlineEntry, SampleIndex};
        use std::rc::Rc;

        let mut index = SampleIndex::new();
        let a_c = index.interner.intern_file("a.c");
        let b_c = index.interner.intern_file("b.c");
        let foo = index.interner.intern_func("foo");

        let mut scopes = ScopeTree::new();
        let outer = scopes.push(None, Some((a_c, 42)));
        let stmt = Statement::inlined_at((b_c, 7), outer);

        let stack: Rc<[StackFrame]> = Rc::from(vec![(a_c, 42), (b_c, 7)]);
        assert!(index.insert_inline_total(InlineEntry {
            stack,
            file: b_c,
            func: foo,
            line: 0,
            freq: 500,
            num_instr: 0,
        }));

        let total = get_total_count(&index, &scopes, &stmt, foo);
        assert_eq!(total, Some(500));
    }

    #[test]
    fn get_total_count_is_none_without_a_matching_entry() {
        let index = SampleIndex::new();
        let scopes = ScopeTree::new();
        let file = crate::entities::FileId::new(0);
        let func = FuncId::new(0);
        let stmt = Statement::at((file, 10));
        assert_eq!(get_total_count(&index, &scopes, &stmt, func), None);
    }
}
