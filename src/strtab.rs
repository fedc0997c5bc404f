//! String interning for file names and function names.
//!
//! The on-disk string table is a flat NUL-terminated byte buffer, with
//! every other structure referring into it by byte offset. The interner
//! below is owned by [`crate::index::SampleIndex`] and lives exactly as
//! long as it does, but stores deduplicated owned strings behind
//! [`FileId`]/[`FuncId`] instead of raw byte offsets, so the rest of the
//! crate never has to re-walk the NUL-terminated buffer or carry a borrow
//! of it around.

use rustc_hash::FxHashMap;

use crate::entities::{FileId, FuncId};

/// Interns file names and function names into compact, `Copy` references.
///
/// Insertion is idempotent: interning the same string twice returns the same
/// id.
#[derive(Default)]
pub struct StringInterner {
    files: Vec<Box<str>>,
    file_ids: FxHashMap<Box<str>, FileId>,
    funcs: Vec<Box<str>>,
    func_ids: FxHashMap<Box<str>, FuncId>,
}

impl StringInterner {
    /// Create an empty interner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a file name, returning its stable id.
    pub fn intern_file(&mut self, name: &str) -> FileId {
        if let Some(id) = self.file_ids.get(name) {
            return *id;
        }
        let id = FileId::new(self.files.len());
        self.files.push(name.into());
        self.file_ids.insert(name.into(), id);
        id
    }

    /// Intern a function name, returning its stable id.
    pub fn intern_func(&mut self, name: &str) -> FuncId {
        if let Some(id) = self.func_ids.get(name) {
            return *id;
        }
        let id = FuncId::new(self.funcs.len());
        self.funcs.push(name.into());
        self.func_ids.insert(name.into(), id);
        id
    }

    /// Look up a file name without interning it. Returns `None` if it was
    /// never interned.
    pub fn find_file(&self, name: &str) -> Option<FileId> {
        self.file_ids.get(name).copied()
    }

    /// Look up a function name without interning it. Returns `None` if it
    /// was never interned.
    pub fn find_func(&self, name: &str) -> Option<FuncId> {
        self.func_ids.get(name).copied()
    }

    /// Resolve a file id back to its string.
    pub fn file_name(&self, id: FileId) -> &str {
        &self.files[id.index()]
    }

    /// Resolve a function id back to its string.
    pub fn func_name(&self, id: FuncId) -> &str {
        &self.funcs[id.index()]
    }
}

/// Read one NUL-terminated string out of a raw string-table buffer at
/// `offset`, as produced by the on-disk format (spec §3 "String table").
pub fn read_cstr(buf: &[u8], offset: u32) -> Option<&str> {
    let start = offset as usize;
    let rest = buf.get(start..)?;
    let len = rest.iter().position(|&b| b == 0)?;
    std::str::from_utf8(&rest[..len]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let mut t = StringInterner::new();
        let a = t.intern_file("a.c");
        let b = t.intern_file("a.c");
        let c = t.intern_file("b.c");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(t.file_name(a), "a.c");
    }

    #[test]
    fn read_cstr_reads_up_to_nul() {
        let buf = b"foo.c\0bar.c\0";
        assert_eq!(read_cstr(buf, 0), Some("foo.c"));
        assert_eq!(read_cstr(buf, 6), Some("bar.c"));
        assert_eq!(read_cstr(buf, 100), None);
    }
}
