//! Sample-based profile annotation: attribute hardware-sampled execution
//! counts to a compiler's basic blocks from a binary sample profile, then
//! smooth the result into a flow-consistent profile a compiler's later
//! passes can treat like instrumented profile data.
//!
//! The pipeline, front to back:
//!
//! 1. [`reader`] parses the on-disk sample file into a [`index::SampleIndex`].
//! 2. [`inline_stack`] reconstructs each statement's inlining path from the
//!    host compiler's lexical-scope tree ([`ir::ScopeTree`]).
//! 3. [`annotate`] looks each statement up in the index and accumulates a
//!    per-block count.
//! 4. [`smoother`] reconciles those counts against the CFG's edge
//!    probabilities and decides whether to adopt the result.
//!
//! [`session`] ties the four stages together behind the two entry points a
//! host compiler actually calls: [`session::init_sample_profile`] once per
//! compilation, then [`session::annotate`] once per function.

pub mod annotate;
pub mod cfg;
pub mod config;
pub mod entities;
pub mod error;
pub mod flow;
pub mod format;
pub mod index;
pub mod inline_stack;
pub mod ir;
pub mod reader;
pub mod session;
pub mod smoother;
pub mod strtab;

pub use cfg::Function;
pub use config::Config;
pub use error::{Error, Result};
pub use session::{annotate, dump_function, end_sample_profile, init_sample_profile, ProfileSession};
pub use smoother::ProfileStatus;
