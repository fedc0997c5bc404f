//! Parses the on-disk sample file into a [`SampleIndex`].
//!
//! Mirrors the algorithm in spec §4.1: read the file header, then the
//! string table, then for each function header read its per-line frequency
//! records and (if present) delegate to the inline reader for its
//! inline-callsite headers.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::format::{
    FileHeader, FreqRecord, FuncHeader, StackEntry, FILE_HEADER_SIZE, FREQ_RECORD_SIZE,
    FUNC_HEADER_SIZE, MAGIC, MAX_STACK, STACK_ENTRY_SIZE, VERSION,
};
use crate::index::{FlatEntry, InlineEntry, SampleIndex, SharedStack};
use crate::strtab::read_cstr;

/// Load a sample profile from `path`, returning the built index and the
/// total number of sample entries it contains.
///
/// I/O failures while reading an individual function's records are logged
/// and stop further loading (spec §4.1 "Error conditions"); the index
/// returned reflects everything read up to that point. Failure to read or
/// validate the fixed file header and string table is unrecoverable and
/// returns `Err`.
pub fn load(path: impl AsRef<Path>) -> Result<(SampleIndex, usize)> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let header = read_file_header(&mut file, path)?;
    let str_table = read_region(&mut file, path, header.str_table_offset, header.str_table_size)?;

    let mut index = SampleIndex::new();

    for i in 0..header.num_func_hdrs {
        let func_hdr_off = header.func_hdr_offset + i * header.func_hdr_ent_size;
        let func_hdr = match read_func_header(&mut file, path, func_hdr_off) {
            Ok(h) => h,
            Err(err) => {
                log::warn!("Error reading function header {i} of `{}`: {err}", path.display());
                break;
            }
        };

        let filename = intern_or_break(&mut index, &str_table, func_hdr.filename_offset);
        let funcname = intern_or_break(&mut index, &str_table, func_hdr.func_name_offset);
        let (filename, funcname) = match (filename, funcname) {
            (Some(f), Some(n)) => (f, n),
            _ => {
                log::warn!(
                    "Error reading function header {i} of `{}`: invalid string offset",
                    path.display()
                );
                break;
            }
        };

        let records_off = header.profile_offset + func_hdr.func_profile_offset + func_hdr.func_freq_offset;
        let records = match read_freq_records(&mut file, path, records_off, func_hdr.num_freq_entries) {
            Ok(r) => r,
            Err(err) => {
                log::warn!("Error reading `{}`: {err}", path.display());
                break;
            }
        };
        for rec in &records {
            index.insert_flat(FlatEntry {
                file: filename,
                func: funcname,
                line: rec.line,
                freq: rec.freq,
                num_instr: rec.num_instr,
            });
        }

        if func_hdr.num_inline_entries > 0 {
            let inline_hdr_table_off =
                header.func_hdr_offset + header.num_func_hdrs * header.func_hdr_ent_size;
            if let Err(err) = read_inline_function(
                &mut file,
                path,
                &header,
                &str_table,
                &mut index,
                inline_hdr_table_off,
                func_hdr.func_inline_hdr_offset,
                func_hdr.num_inline_entries,
                header.func_hdr_ent_size,
            ) {
                log::warn!("read_inline_function(): error reading `{}`: {err}", path.display());
                break;
            }
        }
    }

    let total = index.total_len();
    Ok((index, total))
}

/// Per-function inline reader (spec §4.1 "Inline reader").
#[allow(clippy::too_many_arguments)]
fn read_inline_function(
    file: &mut File,
    path: &Path,
    header: &FileHeader,
    str_table: &[u8],
    index: &mut SampleIndex,
    inline_hdr_table_off: u64,
    func_inline_hdr_offset: u64,
    num_inline_entries: u64,
    ent_size: u64,
) -> Result<()> {
    for k in 0..num_inline_entries {
        let callsite_off = inline_hdr_table_off + func_inline_hdr_offset + k * ent_size;
        let callsite = read_func_header(file, path, callsite_off)?;

        if callsite.num_freq_entries == 0 {
            continue;
        }

        let depth = callsite.inline_depth as usize;
        assert!(
            depth > 0 && depth <= MAX_STACK,
            "inline stack depth {depth} out of bounds (0, {MAX_STACK}]"
        );

        let raw_frames = read_stack_entries(
            file,
            path,
            header.profile_offset + callsite.inline_stack_offset,
            depth,
        )?;

        // On disk the frames are innermost-first; the index stores them
        // outermost-first so lookup is a plain slice comparison against the
        // extractor's output.
        let mut frames = Vec::with_capacity(depth);
        for frame in raw_frames.iter().rev() {
            let Some(file_name) = read_cstr(str_table, frame.filename_offset) else {
                continue;
            };
            let file_id = index.interner.intern_file(file_name);
            frames.push((file_id, frame.line));
        }
        let stack: SharedStack = Rc::from(frames);

        let Some(filename) = read_cstr(str_table, callsite.filename_offset) else {
            continue;
        };
        let Some(funcname) = read_cstr(str_table, callsite.func_name_offset) else {
            continue;
        };
        let file_id = index.interner.intern_file(filename);
        let func_id = index.interner.intern_func(funcname);

        let records_off =
            header.profile_offset + callsite.func_profile_offset + callsite.func_freq_offset;
        let records = read_freq_records(file, path, records_off, callsite.num_freq_entries)?;

        for rec in &records {
            index.insert_inline_line(InlineEntry {
                stack: stack.clone(),
                file: file_id,
                func: func_id,
                line: rec.line,
                freq: rec.freq,
                num_instr: rec.num_instr,
            });
        }

        // The callsite-total entry: line == 0, freq == total samples
        // attributed to the whole inlined invocation.
        index.insert_inline_total(InlineEntry {
            stack,
            file: file_id,
            func: func_id,
            line: 0,
            freq: callsite.total_samples,
            num_instr: 0,
        });
    }
    Ok(())
}

fn intern_or_break(
    index: &mut SampleIndex,
    str_table: &[u8],
    offset: u32,
) -> Option<crate::entities::FileId> {
    read_cstr(str_table, offset).map(|s| index.interner.intern_file(s))
}

fn read_region(file: &mut File, path: &Path, offset: u64, size: u64) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; size as usize];
    file.seek(SeekFrom::Start(offset)).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    file.read_exact(&mut buf).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(buf)
}

fn read_file_header(file: &mut File, path: &Path) -> Result<FileHeader> {
    let buf = read_region(file, path, 0, FILE_HEADER_SIZE as u64)?;
    let mut r = ByteCursor(&buf);
    let magic = r.u32();
    let version = r.u32();
    if magic != MAGIC {
        return Err(Error::BadMagic(path.to_path_buf()));
    }
    if version != VERSION {
        return Err(Error::UnsupportedVersion {
            path: path.to_path_buf(),
            version,
        });
    }
    Ok(FileHeader {
        magic,
        version,
        str_table_offset: r.u64(),
        str_table_size: r.u64(),
        func_hdr_offset: r.u64(),
        num_func_hdrs: r.u64(),
        func_hdr_ent_size: r.u64(),
        profile_offset: r.u64(),
        profile_size: r.u64(),
    })
}

fn read_func_header(file: &mut File, path: &Path, offset: u64) -> Result<FuncHeader> {
    let buf = read_region(file, path, offset, FUNC_HEADER_SIZE as u64)?;
    let mut r = ByteCursor(&buf);
    Ok(FuncHeader {
        filename_offset: r.u32(),
        func_name_offset: r.u32(),
        func_profile_offset: r.u64(),
        func_freq_offset: r.u64(),
        func_inline_hdr_offset: r.u64(),
        inline_stack_offset: r.u64(),
        num_freq_entries: r.u64(),
        num_inline_entries: r.u64(),
        total_samples: r.i64(),
        inline_depth: r.u32(),
    })
}

fn read_freq_records(file: &mut File, path: &Path, offset: u64, count: u64) -> Result<Vec<FreqRecord>> {
    let buf = read_region(file, path, offset, count * FREQ_RECORD_SIZE as u64)?;
    let mut r = ByteCursor(&buf);
    Ok((0..count)
        .map(|_| FreqRecord {
            line: r.u32(),
            freq: r.i64(),
            num_instr: r.u32(),
        })
        .collect())
}

fn read_stack_entries(
    file: &mut File,
    path: &Path,
    offset: u64,
    count: usize,
) -> Result<Vec<StackEntry>> {
    let buf = read_region(file, path, offset, (count * STACK_ENTRY_SIZE) as u64)?;
    let mut r = ByteCursor(&buf);
    Ok((0..count)
        .map(|_| StackEntry {
            filename_offset: r.u32(),
            line: r.u32(),
        })
        .collect())
}

/// A tiny little-endian cursor over an in-memory buffer already known to be
/// the right size (checked by [`read_region`]'s `read_exact`).
struct ByteCursor<'a>(&'a [u8]);

impl<'a> ByteCursor<'a> {
    fn take(&mut self, n: usize) -> &'a [u8] {
        let (head, tail) = self.0.split_at(n);
        self.0 = tail;
        head
    }

    fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take(4).try_into().unwrap())
    }

    fn u64(&mut self) -> u64 {
        u64::from_le_bytes(self.take(8).try_into().unwrap())
    }

    fn i64(&mut self) -> i64 {
        i64::from_le_bytes(self.take(8).try_into().unwrap())
    }
}
