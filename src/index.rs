//! The two-level sample index: a flat store keyed by `(file, line, func)`
//! and an inline store keyed by `(inline_stack, file, line, func)`.
//!
//! Both stores give O(1) expected lookup via [`rustc_hash::FxHashMap`],
//! matching the hash-table approach `cranelift-codegen` uses throughout its
//! own compiler passes (see `fx.rs`). The spec this crate implements
//! describes a hand-rolled incremental byte hash over the key tuple; this
//! crate keeps the *structural* hash-table contract (same key tuple, same
//! collision tie-break) but lets `#[derive(Hash)]` do the mixing rather than
//! reimplementing a custom mixer, since nothing downstream depends on the
//! bit pattern of the hash itself.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::entities::{FileId, FuncId};
use crate::strtab::StringInterner;

/// One `(file, line)` frame of an inline stack, outermost-to-innermost order
/// within the shared slice (reversed from the innermost-first order the
/// on-disk format uses).
pub type StackFrame = (FileId, u32);

/// A stack of inline frames shared by every entry produced from one
/// inline-callsite header. Reference counted so that releasing the last
/// entry that needs it releases the backing allocation — the same effect as
/// the `is_first`-owns-release convention the spec describes, without
/// needing that flag.
pub type SharedStack = Rc<[StackFrame]>;

/// An entry in the flat store: a per-line sample not reached through any
/// inlining.
#[derive(Debug, Clone, Copy)]
pub struct FlatEntry {
    /// Source file of the sampled line.
    pub file: FileId,
    /// Function the sample was attributed to.
    pub func: FuncId,
    /// Source line number. Always `> 0`.
    pub line: u32,
    /// Sampled frequency at this line.
    pub freq: i64,
    /// Number of sampled instructions that contributed to `freq`.
    pub num_instr: u32,
}

/// An entry in the inline store: either a per-line sample within an inlined
/// body, or a callsite-total entry (`line == 0`) summing one inlined
/// invocation.
#[derive(Debug, Clone)]
pub struct InlineEntry {
    /// The inline stack this entry was reached through, outermost-first.
    pub stack: SharedStack,
    /// Source file of the sampled line (the innermost frame's file).
    pub file: FileId,
    /// Function the sample was attributed to.
    pub func: FuncId,
    /// Source line, or `0` for a callsite-total entry.
    pub line: u32,
    /// Sampled frequency.
    pub freq: i64,
    /// Number of sampled instructions that contributed to `freq`. Always 0
    /// for a callsite-total entry.
    pub num_instr: u32,
}

impl InlineEntry {
    /// Is this the dedicated callsite-total entry for its callsite?
    pub fn is_callsite_total(&self) -> bool {
        self.line == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct FlatKey {
    file: FileId,
    line: u32,
    func: FuncId,
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct InlineKey {
    stack: SharedStack,
    file: FileId,
    line: u32,
    func: FuncId,
}

/// The sample index built once per compilation unit by [`crate::reader`],
/// consulted read-only by [`crate::annotate`].
#[derive(Default)]
pub struct SampleIndex {
    /// File and function name interner, owned for the index's whole
    /// lifetime.
    pub interner: StringInterner,
    flat: FxHashMap<FlatKey, FlatEntry>,
    inline: FxHashMap<InlineKey, InlineEntry>,
    /// The maximum `freq` across every record ever inserted into either
    /// store (spec's `sp_max_count`).
    pub max_count: i64,
}

impl SampleIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a flat sample entry. Returns `false` (and logs a diagnostic)
    /// if the key `(file, line, func)` already has an entry — first
    /// insertion wins.
    ///
    /// # Panics
    ///
    /// Panics if `entry.line == 0`; the flat store's invariant is enforced
    /// at insertion, not only during hashing (an explicit choice — see
    /// `SPEC_FULL.md`'s "Open questions" resolution).
    pub fn insert_flat(&mut self, entry: FlatEntry) -> bool {
        assert!(entry.line > 0, "flat sample entries must have line > 0");
        let key = FlatKey {
            file: entry.file,
            line: entry.line,
            func: entry.func,
        };
        if self.flat.contains_key(&key) {
            log::warn!(
                "Duplicate entry: {}:{} func_name:{}",
                self.interner.file_name(entry.file),
                entry.line,
                self.interner.func_name(entry.func),
            );
            return false;
        }
        self.max_count = self.max_count.max(entry.freq);
        self.flat.insert(key, entry);
        true
    }

    /// Insert an inline *line* sample entry — a per-line frequency within
    /// an inlined body. Returns `false` (and logs a diagnostic) if the full
    /// key `(stack, file, line, func)` is already present.
    ///
    /// # Panics
    ///
    /// Panics if `entry.line == 0`; spec §3 draws the line-entry/
    /// callsite-total distinction on exactly this field, so a zero here is
    /// a malformed per-line record (structural impossibility, spec §7), not
    /// a legitimate callsite total — use [`SampleIndex::insert_inline_total`]
    /// for those.
    pub fn insert_inline_line(&mut self, entry: InlineEntry) -> bool {
        assert!(entry.line > 0, "inline line-sample entries must have line > 0");
        self.insert_inline_entry(entry)
    }

    /// Insert the dedicated callsite-total entry for one inlined invocation
    /// (`line == 0`, `freq` equal to the callsite's total sampled
    /// frequency). Returns `false` (and logs a diagnostic) if the full key
    /// is already present.
    ///
    /// # Panics
    ///
    /// Panics if `entry.line != 0` — a callsite total is identified by
    /// `line == 0` (spec §3); anything else belongs in
    /// [`SampleIndex::insert_inline_line`] instead.
    pub fn insert_inline_total(&mut self, entry: InlineEntry) -> bool {
        assert!(entry.line == 0, "callsite-total entries must have line == 0");
        self.insert_inline_entry(entry)
    }

    fn insert_inline_entry(&mut self, entry: InlineEntry) -> bool {
        let key = InlineKey {
            stack: entry.stack.clone(),
            file: entry.file,
            line: entry.line,
            func: entry.func,
        };
        if self.inline.contains_key(&key) {
            log::warn!(
                "Duplicate entry: {}:{} func_name:{}",
                self.interner.file_name(entry.file),
                entry.line,
                self.interner.func_name(entry.func),
            );
            return false;
        }
        self.max_count = self.max_count.max(entry.freq);
        self.inline.insert(key, entry);
        true
    }

    /// Look up a flat sample by `(file, line, func)`.
    pub fn find_flat(&self, file: FileId, line: u32, func: FuncId) -> Option<&FlatEntry> {
        self.flat.get(&FlatKey { file, line, func })
    }

    /// Look up an inline sample by `(stack, file, line, func)`. `stack` must
    /// be in outermost-first order, matching how this index stores it.
    pub fn find_inline(
        &self,
        stack: &[StackFrame],
        file: FileId,
        line: u32,
        func: FuncId,
    ) -> Option<&InlineEntry> {
        // `InlineKey` borrows its stack as an `Rc<[_]>` for storage, but
        // lookups only need to compare contents, so build a throwaway `Rc`
        // from the borrowed slice rather than requiring callers to already
        // hold one.
        let key = InlineKey {
            stack: Rc::from(stack),
            file,
            line,
            func,
        };
        self.inline.get(&key)
    }

    /// Number of entries in the flat store.
    pub fn flat_len(&self) -> usize {
        self.flat.len()
    }

    /// Number of entries in the inline store.
    pub fn inline_len(&self) -> usize {
        self.inline.len()
    }

    /// Total number of entries across both stores — the "N samples" count
    /// reported by [`crate::session::init_sample_profile`].
    pub fn total_len(&self) -> usize {
        self.flat_len() + self.inline_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(idx: &mut SampleIndex, file: &str, func: &str) -> (FileId, FuncId) {
        (idx.interner.intern_file(file), idx.interner.intern_func(func))
    }

    #[test]
    fn flat_round_trip() {
        let mut idx = SampleIndex::new();
        let (file, func) = ids(&mut idx, "a.c", "foo");
        let entry = FlatEntry {
            file,
            func,
            line: 10,
            freq: 100,
            num_instr: 4,
        };
        assert!(idx.insert_flat(entry));
        let found = idx.find_flat(file, 10, func).unwrap();
        assert_eq!(found.freq, 100);
        assert_eq!(found.num_instr, 4);
        assert_eq!(idx.max_count, 100);
    }

    #[test]
    fn flat_duplicate_keeps_first() {
        let mut idx = SampleIndex::new();
        let (file, func) = ids(&mut idx, "a.c", "foo");
        let first = FlatEntry {
            file,
            func,
            line: 10,
            freq: 100,
            num_instr: 4,
        };
        let second = FlatEntry {
            freq: 999,
            ..first
        };
        assert!(idx.insert_flat(first));
        assert!(!idx.insert_flat(second));
        assert_eq!(idx.find_flat(file, 10, func).unwrap().freq, 100);
    }

    #[test]
    #[should_panic]
    fn flat_zero_line_panics() {
        let mut idx = SampleIndex::new();
        let (file, func) = ids(&mut idx, "a.c", "foo");
        idx.insert_flat(FlatEntry {
            file,
            func,
            line: 0,
            freq: 1,
            num_instr: 1,
        });
    }

    #[test]
    #[should_panic]
    fn inline_line_entry_with_zero_line_panics() {
        let mut idx = SampleIndex::new();
        let (file, func) = ids(&mut idx, "a.c", "foo");
        let stack: SharedStack = Rc::from(vec![(file, 1)]);
        idx.insert_inline_line(InlineEntry {
            stack,
            file,
            func,
            line: 0,
            freq: 1,
            num_instr: 1,
        });
    }

    #[test]
    #[should_panic]
    fn inline_total_entry_with_nonzero_line_panics() {
        let mut idx = SampleIndex::new();
        let (file, func) = ids(&mut idx, "a.c", "foo");
        let stack: SharedStack = Rc::from(vec![(file, 1)]);
        idx.insert_inline_total(InlineEntry {
            stack,
            file,
            func,
            line: 7,
            freq: 1,
            num_instr: 0,
        });
    }

    #[test]
    fn inline_round_trip_with_shared_stack() {
        let mut idx = SampleIndex::new();
        let (a_c, foo) = ids(&mut idx, "a.c", "foo");
        let (b_c, _) = ids(&mut idx, "b.c", "foo");
        let stack: SharedStack = Rc::from(vec![(a_c, 42), (b_c, 7)]);

        let line_entry = InlineEntry {
            stack: stack.clone(),
            file: b_c,
            func: foo,
            line: 7,
            freq: 500,
            num_instr: 5,
        };
        let total_entry = InlineEntry {
            stack: stack.clone(),
            file: b_c,
            func: foo,
            line: 0,
            freq: 500,
            num_instr: 0,
        };
        assert!(idx.insert_inline_line(line_entry));
        assert!(idx.insert_inline_total(total_entry));

        let found = idx
            .find_inline(&[(a_c, 42), (b_c, 7)], b_c, 7, foo)
            .unwrap();
        assert_eq!(found.freq, 500);

        let total = idx.find_inline(&[(a_c, 42), (b_c, 7)], b_c, 0, foo).unwrap();
        assert!(total.is_callsite_total());
        assert_eq!(total.freq, 500);
    }
}
