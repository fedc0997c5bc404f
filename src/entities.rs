//! Opaque entity references used as index-table keys.
//!
//! Source file names and function (assembler) names are interned once at
//! load time; everywhere else in the crate refers to them by these compact
//! `u32` references rather than by string slice, the same trade cranelift's
//! own IR entities make (see `cranelift-codegen`'s `ir::entities`).

use cranelift_entity::entity_impl;

/// A reference to an interned source file name.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct FileId(u32);
entity_impl!(FileId, "file");

/// A reference to an interned function (assembler-mangled) name.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct FuncId(u32);
entity_impl!(FuncId, "func");

/// A reference to a basic block within a [`crate::cfg::Function`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Block(u32);
entity_impl!(Block, "block");

/// A reference to a lexical scope within a [`crate::ir::ScopeTree`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Scope(u32);
entity_impl!(Scope, "scope");
