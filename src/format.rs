//! On-disk layout of the binary sample-profile file.
//!
//! Little-endian, fixed widths throughout. This module only describes the
//! layout; [`crate::reader`] does the actual parsing.

/// Magic number identifying a sample-profile file (`"GSP2"` read as a
/// little-endian `u32`). Not specified by the format this crate distills
/// from; added here so a malformed or unrelated file is rejected up front
/// instead of producing nonsense offsets.
pub const MAGIC: u32 = 0x3250_5347;

/// The only file-format version this crate understands.
pub const VERSION: u32 = 1;

/// Maximum permitted inline-stack depth. Exceeding this is a structural
/// impossibility (an assertion-class error), not a recoverable one.
pub const MAX_STACK: usize = 200;

/// Fixed-size file header, read first.
///
/// Layout on disk (all fields little-endian):
///
/// ```text
/// offset  size  field
///      0     4  magic
///      4     4  version
///      8     8  str_table_offset
///     16     8  str_table_size
///     24     8  func_hdr_offset
///     32     8  num_func_hdrs
///     40     8  func_hdr_ent_size
///     48     8  profile_offset
///     56     8  profile_size
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// Must equal [`MAGIC`].
    pub magic: u32,
    /// Must equal [`VERSION`] (for now; future versions may widen this).
    pub version: u32,
    /// Byte offset of the string table region.
    pub str_table_offset: u64,
    /// Byte size of the string table region.
    pub str_table_size: u64,
    /// Byte offset of the function-header table.
    pub func_hdr_offset: u64,
    /// Number of (top-level) function headers.
    pub num_func_hdrs: u64,
    /// Uniform size in bytes of one function header / inline-callsite header.
    pub func_hdr_ent_size: u64,
    /// Byte offset of the profile-data region (inline-stack entries and
    /// per-line frequency records).
    pub profile_offset: u64,
    /// Byte size of the profile-data region.
    pub profile_size: u64,
}

/// Byte size of a serialized [`FileHeader`].
pub const FILE_HEADER_SIZE: usize = 64;

/// A function header (or, with nonzero `inline_depth`, an inline-callsite
/// header — the two share this same shape per spec).
///
/// Layout on disk (little-endian):
///
/// ```text
/// offset  size  field
///      0     4  filename_offset
///      4     4  func_name_offset
///      8     8  func_profile_offset
///     16     8  func_freq_offset
///     24     8  func_inline_hdr_offset
///     32     8  inline_stack_offset
///     40     8  num_freq_entries
///     48     8  num_inline_entries
///     56     8  total_samples   (i64)
///     64     4  inline_depth
///     68     4  _pad
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuncHeader {
    /// Offset into the string table of this function's source file name.
    pub filename_offset: u32,
    /// Offset into the string table of this function's (assembler) name.
    pub func_name_offset: u32,
    /// Offset of this function's per-line frequency records, relative to
    /// `profile_offset`.
    pub func_profile_offset: u64,
    /// Offset of the first frequency record, relative to
    /// `func_profile_offset` (spec's `func_freq_offset`).
    pub func_freq_offset: u64,
    /// Offset of this function's inline-callsite headers, relative to the
    /// start of the inline-header table.
    pub func_inline_hdr_offset: u64,
    /// Offset into the profile-data region of this callsite's inline-stack
    /// entries. Unused (zero) for top-level function headers.
    pub inline_stack_offset: u64,
    /// Number of per-line frequency records owned by this header.
    pub num_freq_entries: u64,
    /// Number of inline-callsite headers owned by this (top-level) header.
    pub num_inline_entries: u64,
    /// Total sampled frequency attributed to this function/callsite.
    pub total_samples: i64,
    /// 0 for a top-level function header, >0 for an inline-callsite header.
    pub inline_depth: u32,
}

/// Byte size of a serialized [`FuncHeader`].
pub const FUNC_HEADER_SIZE: usize = 72;

/// One per-line frequency record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreqRecord {
    /// Source line number.
    pub line: u32,
    /// Sampled frequency at this line.
    pub freq: i64,
    /// Number of sampled instructions that contributed to `freq`.
    pub num_instr: u32,
}

/// Byte size of a serialized [`FreqRecord`].
pub const FREQ_RECORD_SIZE: usize = 16;

/// One inline-stack entry, as stored on disk (innermost-first).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackEntry {
    /// Offset into the string table of this frame's source file name.
    pub filename_offset: u32,
    /// Source line number of this frame.
    pub line: u32,
}

/// Byte size of a serialized [`StackEntry`].
pub const STACK_ENTRY_SIZE: usize = 8;
