//! Uniform in-memory representation of per-file coverage facts,
//! independent of how they were collected. The tracer and static
//! analyzer supply a `FileFacts` bundle per file; everything else in the
//! engine is derived from it.

use std::collections::{BTreeMap, BTreeSet};

/// A 1-based source line number.
///
/// Negative values are synthetic entry/exit sentinels (module entry,
/// function return) distinct from any real line. They participate in
/// set and arc arithmetic like ordinary lines but are never reported as
/// missing lines on their own.
pub type LineNo = i32;

/// A set of line numbers, kept sorted for stable serialization.
pub type LineSet = BTreeSet<LineNo>;

/// A directed control-flow edge taken between two lines.
pub type Arc = (LineNo, LineNo);

/// A set of arcs, ordered by source then target.
pub type ArcSet = BTreeSet<Arc>;

/// Observed context labels per line (e.g. test names). The engine relays
/// these verbatim; it never interprets the labels.
pub type ContextMap = BTreeMap<LineNo, BTreeSet<String>>;

/// The kind of a named sub-extent of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    Module,
    Class,
    Function,
}

impl RegionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegionKind::Module => "module",
            RegionKind::Class => "class",
            RegionKind::Function => "function",
        }
    }
}

impl std::fmt::Display for RegionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named sub-extent of a file (function, class, module) supplied by
/// the static analyzer. Regions may overlap; `lines` is the set
/// belonging to the region's own body. The engine only intersects with
/// these lines, it never interprets nesting.
#[derive(Debug, Clone)]
pub struct CodeRegion {
    pub kind: RegionKind,
    /// Qualified name, e.g. `"D.e"` for a method.
    pub name: String,
    pub lines: LineSet,
}

/// Raw per-file facts pulled from the tracer and the static analyzer.
#[derive(Debug, Clone, Default)]
pub struct FileFacts {
    /// Lines the analyzer considers executable.
    pub statements: LineSet,
    /// Statements explicitly marked non-counting. Removed from the
    /// denominator entirely.
    pub excluded: LineSet,
    /// Lines observed as run. Unfiltered trace output; lines outside the
    /// counted statements are ignored during analysis.
    pub executed: LineSet,
    /// The complete set of arcs the analyzer determined could occur.
    pub possible_arcs: Option<ArcSet>,
    /// Arcs actually observed. Unfiltered; arcs outside `possible_arcs`
    /// are dropped during analysis.
    pub executed_arcs: Option<ArcSet>,
    /// Context labels per line, if the tracer recorded any.
    pub contexts: Option<ContextMap>,
    /// Named sub-extents reported by the analyzer.
    pub regions: Vec<CodeRegion>,
}
