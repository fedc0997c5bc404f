//! The block annotator: turns per-line samples into a per-basic-block
//! count, per spec §4.4.

use rustc_hash::FxHashSet;

use crate::cfg::{Block, Function};
use crate::format::MAX_STACK;
use crate::index::SampleIndex;
use crate::inline_stack::extract_stack;

/// Dedup sets are bounded at this capacity (spec §4.4 step 2); a block with
/// more distinct sampled index entries than this is vanishingly unlikely in
/// practice; reserving up front avoids repeated reallocation on the
/// common-sized block.
const DEDUP_CAPACITY: usize = 500;

/// Annotate every real basic block of `func`, setting each block's `count`.
///
/// Idempotent with respect to `index`: running this twice on the same
/// function produces the same counts, since it only reads `index` and only
/// writes `Function::block_mut(..).count`.
pub fn annotate_function(index: &SampleIndex, func: &mut Function) {
    let blocks: Vec<Block> = func.order().to_vec();
    for block in blocks {
        let count = annotate_block(index, func, block);
        func.block_mut(block).count = count;
    }
}

/// Compute the count for a single basic block (spec §4.4).
///
/// Dispatches each statement to the flat or inline store depending on
/// whether it carries a nonempty inline stack; both arms share the same
/// accumulation helper rather than duplicating it (spec §9's note on
/// avoiding an inheritance hierarchy here).
pub fn annotate_block(index: &SampleIndex, func: &Function, block: Block) -> i64 {
    let mut sum_freq: i64 = 0;
    let mut sum_instr: u64 = 0;

    let mut seen_flat: FxHashSet<usize> = FxHashSet::default();
    seen_flat.reserve(DEDUP_CAPACITY);
    let mut seen_inline: FxHashSet<usize> = FxHashSet::default();
    seen_inline.reserve(DEDUP_CAPACITY);

    for stmt in &func.block(block).statements {
        let Some((file, line)) = stmt.loc else {
            // Unknown line (spec's "-1"): skip this statement entirely.
            continue;
        };

        let stack = extract_stack(&func.scopes, stmt);
        assert!(
            stack.len() < MAX_STACK,
            "inline stack depth {} exceeds MAX_STACK",
            stack.len()
        );

        if stack.is_empty() {
            if let Some(entry) = index.find_flat(file, line, func.name) {
                let ptr = entry as *const _ as usize;
                if seen_flat.insert(ptr) {
                    accumulate(&mut sum_freq, &mut sum_instr, entry.freq, entry.num_instr);
                }
            }
        } else if let Some(entry) = index.find_inline(&stack, file, line, func.name) {
            let ptr = entry as *const _ as usize;
            if seen_inline.insert(ptr) {
                accumulate(&mut sum_freq, &mut sum_instr, entry.freq, entry.num_instr);
            }
        }
    }

    if sum_instr > 0 {
        sum_freq / sum_instr as i64
    } else {
        0
    }
}

fn accumulate(sum_freq: &mut i64, sum_instr: &mut u64, freq: i64, num_instr: u32) {
    *sum_freq += freq;
    *sum_instr += num_instr as u64;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{FlatEntry, SampleIndex};
    use crate::ir::Statement;

    fn index_with_s1_sample() -> (SampleIndex, crate::entities::FileId, crate::entities::FuncId) {
        let mut index = SampleIndex::new();
        let file = index.interner.intern_file("a.c");
        let func = index.interner.intern_func("foo");
        index.insert_flat(FlatEntry {
            file,
            func,
            line: 10,
            freq: 100,
            num_instr: 4,
        });
        (index, file, func)
    }

    #[test]
    fn s1_single_flat_sample() {
        let (index, file, func) = index_with_s1_sample();
        let mut f = Function::new(func);
        let b0 = f.create_block();
        let b1 = f.create_block();
        f.block_mut(b0).statements.push(Statement::at((file, 10)));

        annotate_function(&index, &mut f);
        assert_eq!(f.block(b0).count, 25);
        assert_eq!(f.block(b1).count, 0);
    }

    #[test]
    fn s2_dedup_within_a_block() {
        let (index, file, func) = index_with_s1_sample();
        let mut f = Function::new(func);
        let b0 = f.create_block();
        f.block_mut(b0).statements.push(Statement::at((file, 10)));
        f.block_mut(b0).statements.push(Statement::at((file, 10)));

        let count = annotate_block(&index, &f, b0);
        assert_eq!(count, 25, "dedup must prevent double-credit, not produce 50");
    }

    #[test]
    fn annotating_twice_is_idempotent() {
        let (index, file, func) = index_with_s1_sample();
        let mut f = Function::new(func);
        let b0 = f.create_block();
        f.block_mut(b0).statements.push(Statement::at((file, 10)));

        let first = annotate_block(&index, &f, b0);
        let second = annotate_block(&index, &f, b0);
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_line_is_skipped() {
        let (index, _file, func) = index_with_s1_sample();
        let mut f = Function::new(func);
        let b0 = f.create_block();
        f.block_mut(b0).statements.push(Statement::unknown());

        assert_eq!(annotate_block(&index, &f, b0), 0);
    }

    #[test]
    fn zero_num_instr_contributes_nothing() {
        let mut index = SampleIndex::new();
        let file = index.interner.intern_file("a.c");
        let func = index.interner.intern_func("foo");
        index.insert_flat(FlatEntry {
            file,
            func,
            line: 10,
            freq: 100,
            num_instr: 0,
        });
        let mut f = Function::new(func);
        let b0 = f.create_block();
        f.block_mut(b0).statements.push(Statement::at((file, 10)));

        assert_eq!(annotate_block(&index, &f, b0), 0);
    }
}
