//! Consumer-facing configuration, per spec §6.3.

use std::path::PathBuf;

use crate::error::{Error, Result};

/// Configuration governing whether and how sample-profile annotation runs.
///
/// Mirrors a host compiler's command-line flags as an explicit struct
/// instead of free-standing globals, the same shape `cranelift-codegen`'s
/// own `settings.rs` gives its `Flags` builder.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether sample-profile annotation should run at all.
    pub enable: bool,
    /// Whether branch-probability generation (instrumentation-based) is also
    /// requested. Mutually exclusive with sample-profile annotation; when
    /// both are set, branch-probability generation wins.
    pub branch_probabilities: bool,
    /// Path to the binary sample-profile file to load.
    pub sample_data_name: PathBuf,
    /// Whether to dump the post-smoothing CFG (spec §6.2).
    pub profile_dump: bool,
    /// Destination for the CFG dump. `None` means no destination was
    /// configured even though `profile_dump` is set; callers should treat
    /// that combination as a configuration error at the call site, not a
    /// silent no-op.
    pub dump_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable: false,
            branch_probabilities: false,
            sample_data_name: PathBuf::from("sp.data"),
            profile_dump: false,
            dump_path: None,
        }
    }
}

impl Config {
    /// Resolve the configuration-conflict rule: sample-profile annotation
    /// and branch-probability generation cannot both be active. When both
    /// are requested, branch-probabilities wins and sample-profile
    /// annotation is disabled.
    ///
    /// Returns `Err(Error::ConfigConflict)` in that case so the caller can
    /// surface the diagnostic; `enable` is left as `true` in the returned
    /// config either way — callers that want the disabling behavior should
    /// match on the error and call [`Config::with_sample_profile_disabled`].
    pub fn resolve(&self) -> Result<()> {
        if self.enable && self.branch_probabilities {
            log::warn!(
                "sample profiling and -fbranch-probabilities-generate are mutually exclusive; \
                 disabling sample profiling"
            );
            return Err(Error::ConfigConflict);
        }
        Ok(())
    }

    /// A copy of this configuration with sample-profile annotation turned
    /// off, for the caller to adopt after [`Config::resolve`] reports a
    /// conflict.
    pub fn with_sample_profile_disabled(&self) -> Self {
        Self {
            enable: false,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_disabled_with_default_data_name() {
        let cfg = Config::default();
        assert!(!cfg.enable);
        assert_eq!(cfg.sample_data_name, PathBuf::from("sp.data"));
    }

    #[test]
    fn conflicting_flags_disable_sample_profile() {
        let mut cfg = Config::default();
        cfg.enable = true;
        cfg.branch_probabilities = true;
        assert!(matches!(cfg.resolve(), Err(Error::ConfigConflict)));
        assert!(!cfg.with_sample_profile_disabled().enable);
    }

    #[test]
    fn no_conflict_when_only_one_flag_set() {
        let mut cfg = Config::default();
        cfg.enable = true;
        assert!(cfg.resolve().is_ok());
    }
}
