//! Report assembly and serialization.
//!
//! [`assemble`] walks a fact source, analyzes each file, folds the
//! per-file numbers into a grand total, and returns an immutable
//! [`Report`]. The serialized shape (field names, nesting, and
//! `meta.format`) is the wire contract downstream tooling parses: field
//! additions are backward-compatible, anything else bumps the version.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::analysis::{flatten_arcs, LineAnalysis};
use crate::config::ReportConfig;
use crate::error::{CovsumError, Result};
use crate::model::{Arc, FileFacts, LineNo, RegionKind};
use crate::numbers::Numbers;
use crate::source::FactSource;

/// Schema version of the serialized report. Bumped only on a breaking
/// structural change.
pub const FORMAT_VERSION: u32 = 2;

/// The `meta` block of a report.
#[derive(Debug, Clone, Serialize)]
pub struct Meta {
    pub format: u32,
    /// Producer identity.
    pub version: String,
    /// UTC timestamp of assembly, RFC 3339.
    pub timestamp: String,
    /// Whether branch data is present.
    pub branch_coverage: bool,
    /// Whether context maps are included.
    pub show_contexts: bool,
}

/// Aggregate counts plus display percentage for one entry.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub covered_lines: u64,
    pub num_statements: u64,
    pub percent_covered: f64,
    pub percent_covered_display: String,
    pub missing_lines: u64,
    pub excluded_lines: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_branches: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_partial_branches: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub covered_branches: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_branches: Option<u64>,
}

impl Summary {
    fn new(nums: &Numbers, branch: bool, precision: usize) -> Summary {
        Summary {
            covered_lines: nums.n_executed,
            num_statements: nums.n_statements,
            percent_covered: nums.pc_covered(),
            percent_covered_display: nums.pc_covered_str(precision),
            missing_lines: nums.n_missing,
            excluded_lines: nums.n_excluded,
            num_branches: branch.then_some(nums.n_branches),
            num_partial_branches: branch.then_some(nums.n_partial_branches),
            covered_branches: branch.then_some(nums.n_executed_branches),
            missing_branches: branch.then_some(nums.n_missing_branches),
        }
    }
}

/// One file in the report, or one narrowed region entry nested under a
/// file. Region maps appear only on top-level file entries.
#[derive(Debug, Clone, Serialize)]
pub struct FileEntry {
    pub executed_lines: Vec<LineNo>,
    pub summary: Summary,
    pub missing_lines: Vec<LineNo>,
    pub excluded_lines: Vec<LineNo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contexts: Option<BTreeMap<LineNo, Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executed_branches: Option<Vec<Arc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_branches: Option<Vec<Arc>>,
    #[serde(rename = "function", skip_serializing_if = "Option::is_none")]
    pub functions: Option<BTreeMap<String, FileEntry>>,
    #[serde(rename = "class", skip_serializing_if = "Option::is_none")]
    pub classes: Option<BTreeMap<String, FileEntry>>,
}

/// The serialized report value.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub meta: Meta,
    pub files: BTreeMap<String, FileEntry>,
    pub totals: Summary,
}

impl Report {
    /// Serialize to a JSON string.
    pub fn to_json_string(&self, pretty: bool) -> Result<String> {
        Ok(if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        })
    }

    /// Write the report as JSON to `out`.
    pub fn write_json<W: Write>(&self, out: W, pretty: bool) -> Result<()> {
        if pretty {
            serde_json::to_writer_pretty(out, self)?;
        } else {
            serde_json::to_writer(out, self)?;
        }
        Ok(())
    }
}

/// A file omitted from the report, with the upstream error.
#[derive(Debug)]
pub struct FileFailure {
    pub path: String,
    pub error: anyhow::Error,
}

/// The outcome of one [`assemble`] run.
#[derive(Debug)]
pub struct Assembled {
    pub report: Report,
    /// Grand totals, folded from the per-file numbers.
    pub totals: Numbers,
    /// Per-file failures. Never fatal to the run.
    pub failures: Vec<FileFailure>,
}

impl Assembled {
    /// Overall percent covered, or `None` when no statements were
    /// measured anywhere.
    #[must_use]
    pub fn percent_covered(&self) -> Option<f64> {
        (self.totals.n_statements > 0).then(|| self.totals.pc_covered())
    }

    /// Pass/fail gate against a minimum coverage percentage. A run that
    /// measured no statements passes vacuously.
    #[must_use]
    pub fn meets_threshold(&self, minimum: f64) -> bool {
        self.percent_covered().map_or(true, |pc| pc >= minimum)
    }
}

/// Assemble a report from `source` under `config`.
///
/// Files whose facts cannot be fetched are omitted and recorded in
/// [`Assembled::failures`]; the run continues with the remaining files.
pub fn assemble(source: &dyn FactSource, config: &ReportConfig) -> Result<Assembled> {
    let never = AtomicBool::new(false);
    assemble_cancellable(source, config, &never)
}

/// Like [`assemble`], but checks `cancel` between per-file iterations
/// and aborts with [`CovsumError::Cancelled`] once it is set. Nothing
/// partial is returned from a cancelled run.
pub fn assemble_cancellable(
    source: &dyn FactSource,
    config: &ReportConfig,
    cancel: &AtomicBool,
) -> Result<Assembled> {
    let mut files = BTreeMap::new();
    let mut failures = Vec::new();
    let mut total = Numbers::default();

    for path in source.files() {
        if cancel.load(Ordering::Relaxed) {
            return Err(CovsumError::Cancelled);
        }
        let facts = match source.facts(&path) {
            Ok(facts) => facts,
            Err(error) => {
                warn!(path = %path, %error, "skipping file: facts unavailable");
                failures.push(FileFailure { path, error });
                continue;
            }
        };
        let analysis = LineAnalysis::from_facts(&facts, config.branch);
        let nums = analysis.numbers();
        debug!(path = %path, statements = nums.n_statements, "analyzed file");
        total += nums;
        files.insert(path, file_entry(&analysis, &facts, config));
    }

    let report = Report {
        meta: Meta {
            format: FORMAT_VERSION,
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            branch_coverage: config.branch,
            show_contexts: config.show_contexts,
        },
        files,
        totals: Summary::new(&total, config.branch, config.precision),
    };

    Ok(Assembled {
        report,
        totals: total,
        failures,
    })
}

/// Build the report entry for one file, narrowing into each region whose
/// kind is enabled. Disabled kinds are never analyzed.
fn file_entry(analysis: &LineAnalysis, facts: &FileFacts, config: &ReportConfig) -> FileEntry {
    let mut entry = extent_entry(analysis, facts, config);

    for region in &facts.regions {
        if !config.region_enabled(region.kind) {
            continue;
        }
        let narrowed = analysis.narrow(&region.lines);
        let nested = extent_entry(&narrowed, facts, config);
        let slot = match region.kind {
            RegionKind::Function => entry.functions.get_or_insert_with(BTreeMap::new),
            RegionKind::Class => entry.classes.get_or_insert_with(BTreeMap::new),
            RegionKind::Module => continue,
        };
        slot.insert(region.name.clone(), nested);
    }

    entry
}

/// The entry fields shared by full files and narrowed regions.
fn extent_entry(analysis: &LineAnalysis, facts: &FileFacts, config: &ReportConfig) -> FileEntry {
    let nums = analysis.numbers();

    // Contexts are relayed unmodified from the collaborator; requesting
    // them when none were recorded yields an empty map, not an error.
    let contexts = config.show_contexts.then(|| {
        facts
            .contexts
            .as_ref()
            .map(|map| {
                map.iter()
                    .map(|(line, labels)| (*line, labels.iter().cloned().collect()))
                    .collect()
            })
            .unwrap_or_default()
    });

    let (executed_branches, missing_branches) = if analysis.has_arcs() {
        (
            Some(flatten_arcs(analysis.executed_branch_arcs()).collect()),
            Some(flatten_arcs(analysis.missing_branch_arcs()).collect()),
        )
    } else {
        (None, None)
    };

    FileEntry {
        executed_lines: analysis.executed().iter().copied().collect(),
        summary: Summary::new(&nums, config.branch, config.precision),
        missing_lines: analysis.missing().iter().copied().collect(),
        excluded_lines: analysis.excluded().iter().copied().collect(),
        contexts,
        executed_branches,
        missing_branches,
        functions: None,
        classes: None,
    }
}
