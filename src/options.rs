//! Generation options.
//!
//! A single [`Options`] value is threaded explicitly through every stage of
//! generation. There are no process globals: two generators with different
//! options can run back to back (or side by side) without interfering.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Output language standard.
///
/// The integer model is identical across all three; the standard only
/// affects emission (type spellings, program prologue, print call).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StandardKind {
    /// C++ (C++11 or later).
    Cxx,
    /// Intel ISPC.
    Ispc,
    /// SYCL single-source C++.
    Sycl,
}

impl StandardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StandardKind::Cxx => "c++",
            StandardKind::Ispc => "ispc",
            StandardKind::Sycl => "sycl",
        }
    }
}

impl fmt::Display for StandardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StandardKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "c++" | "cxx" | "cpp" => Ok(StandardKind::Cxx),
            "ispc" => Ok(StandardKind::Ispc),
            "sycl" => Ok(StandardKind::Sycl),
            other => Err(format!(
                "unknown standard `{other}` (expected c++, ispc, or sycl)"
            )),
        }
    }
}

/// Knobs that shape a generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Options {
    /// Target language standard.
    pub standard: StandardKind,
    /// When true, `long` is 64 bits wide; when false it matches `int`
    /// (32 bits). The conversion rules depend on this.
    pub int64_mode: bool,
    /// Permit emitting `alignas`-style attributes on declarations.
    pub allow_align: bool,
    /// Upper bound on any single array dimension.
    pub max_array_dim: u64,
    /// Upper bound on expression nesting in generated trees.
    pub max_expr_depth: u32,
    /// Retry bound for the UB-elimination rebuild loop. Exhausting it is a
    /// fatal invariant violation, not a runtime condition.
    pub rebuild_budget: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            standard: StandardKind::Cxx,
            int64_mode: true,
            allow_align: false,
            max_array_dim: 1000,
            max_expr_depth: 5,
            rebuild_budget: 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_round_trips_through_str() {
        for std in [StandardKind::Cxx, StandardKind::Ispc, StandardKind::Sycl] {
            assert_eq!(std.as_str().parse::<StandardKind>().unwrap(), std);
        }
        assert!("rust".parse::<StandardKind>().is_err());
    }

    #[test]
    fn default_budget_is_bounded() {
        let opts = Options::default();
        assert!(opts.rebuild_budget > 0);
        assert!(opts.max_array_dim > 0);
    }
}
