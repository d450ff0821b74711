//! Recognized report options.
//!
//! Loading these from a config file or command line is the caller's
//! concern; the engine only reads the resolved values.

use crate::model::RegionKind;

/// Options recognized by the report engine.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Enable arc computation and the branch fields of the report.
    pub branch: bool,
    /// Report narrowed per-function entries.
    pub report_functions: bool,
    /// Report narrowed per-class entries.
    pub report_classes: bool,
    /// Attach per-line context labels to each entry.
    pub show_contexts: bool,
    /// Pretty-print the serialized report. Formatting only; computed
    /// values are unaffected.
    pub pretty_print: bool,
    /// Decimal digits for display percentages.
    pub precision: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            branch: false,
            report_functions: false,
            report_classes: false,
            show_contexts: false,
            pretty_print: false,
            precision: 1,
        }
    }
}

impl ReportConfig {
    /// Whether per-region entries of the given kind are reported.
    /// Disabled kinds are never analyzed at all.
    #[must_use]
    pub fn region_enabled(&self, kind: RegionKind) -> bool {
        match kind {
            RegionKind::Module => false,
            RegionKind::Class => self.report_classes,
            RegionKind::Function => self.report_functions,
        }
    }
}
