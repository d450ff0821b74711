//! Per-extent line and branch analysis.
//!
//! A `LineAnalysis` is a read-only view derived from externally supplied
//! facts: which statements exist, which are excluded, which lines and
//! arcs ran. [`LineAnalysis::narrow`] recomputes the same statistics
//! over an arbitrary line subset (e.g. one function) with identical
//! counting rules. Everything here is pure set algebra with no failure
//! modes.

use std::collections::btree_map;
use std::collections::BTreeMap;

use crate::model::{Arc, ArcSet, FileFacts, LineNo, LineSet};
use crate::numbers::Numbers;

/// Line (and optionally branch) statistics for one analyzed extent.
///
/// Invariant: `statements` is the disjoint union of `executed`,
/// `missing`, and `excluded`.
#[derive(Debug, Clone)]
pub struct LineAnalysis {
    statements: LineSet,
    excluded: LineSet,
    executed: LineSet,
    missing: LineSet,
    arcs: Option<ArcData>,
}

/// Possible and executed arcs for one extent. Kept unrestricted; branch
/// accounting narrows to branch lines on demand.
#[derive(Debug, Clone)]
struct ArcData {
    possible: ArcSet,
    executed: ArcSet,
}

impl LineAnalysis {
    /// Build the analysis for one file. `branch` enables arc
    /// computation; a file measured without arc data then simply has no
    /// branches.
    ///
    /// Executed lines outside the counted statements, and observed arcs
    /// outside the possible set (e.g. from a stale analysis), are
    /// silently dropped.
    #[must_use]
    pub fn from_facts(facts: &FileFacts, branch: bool) -> LineAnalysis {
        let statements = facts.statements.clone();
        let excluded = &facts.excluded & &statements;
        let counted = &statements - &excluded;
        let executed = &facts.executed & &counted;
        let missing = &counted - &executed;

        let arcs = branch.then(|| {
            let possible = facts.possible_arcs.clone().unwrap_or_default();
            let observed = facts.executed_arcs.clone().unwrap_or_default();
            let executed = &observed & &possible;
            ArcData { possible, executed }
        });

        LineAnalysis {
            statements,
            excluded,
            executed,
            missing,
            arcs,
        }
    }

    /// All lines the analyzer considers executable, exclusions included.
    pub fn statements(&self) -> &LineSet {
        &self.statements
    }

    pub fn excluded(&self) -> &LineSet {
        &self.excluded
    }

    pub fn executed(&self) -> &LineSet {
        &self.executed
    }

    pub fn missing(&self) -> &LineSet {
        &self.missing
    }

    /// Whether this analysis carries branch data.
    pub fn has_arcs(&self) -> bool {
        self.arcs.is_some()
    }

    /// Restrict the analysis to `lines`, preserving the counting rules.
    ///
    /// An arc is retained iff its source lies inside `lines`; the
    /// destination may jump out of the region (a `return`, say) and the
    /// arc still counts against the region holding the branching
    /// statement. Lines outside the known statements are ignored.
    #[must_use]
    pub fn narrow(&self, lines: &LineSet) -> LineAnalysis {
        let keep = |arcs: &ArcSet| -> ArcSet {
            arcs.iter()
                .copied()
                .filter(|&(source, _)| lines.contains(&source))
                .collect()
        };
        LineAnalysis {
            statements: &self.statements & lines,
            excluded: &self.excluded & lines,
            executed: &self.executed & lines,
            missing: &self.missing & lines,
            arcs: self.arcs.as_ref().map(|arcs| ArcData {
                possible: keep(&arcs.possible),
                executed: keep(&arcs.executed),
            }),
        }
    }

    /// Summarize the extent into an aggregate record.
    ///
    /// Branch buckets count lines: a branch line is executed only when
    /// all its possible arcs ran, partial when some-but-not-all did, and
    /// lands in neither bucket when none did. `n_missing_branches`
    /// counts arcs. The asymmetry is part of the output contract.
    #[must_use]
    pub fn numbers(&self) -> Numbers {
        let mut nums = Numbers {
            n_statements: (self.statements.len() - self.excluded.len()) as u64,
            n_executed: self.executed.len() as u64,
            n_missing: self.missing.len() as u64,
            n_excluded: self.excluded.len() as u64,
            ..Numbers::default()
        };
        for (taken, missed) in self.branch_outcomes().values() {
            nums.n_branches += 1;
            nums.n_missing_branches += missed.len() as u64;
            if missed.is_empty() {
                nums.n_executed_branches += 1;
            } else if !taken.is_empty() {
                nums.n_partial_branches += 1;
            }
        }
        nums
    }

    /// Executed arcs per branch line, targets in ascending order.
    #[must_use]
    pub fn executed_branch_arcs(&self) -> BTreeMap<LineNo, Vec<LineNo>> {
        self.branch_outcomes()
            .into_iter()
            .map(|(source, (taken, _))| (source, taken))
            .collect()
    }

    /// Missing arcs per branch line, targets in ascending order.
    #[must_use]
    pub fn missing_branch_arcs(&self) -> BTreeMap<LineNo, Vec<LineNo>> {
        self.branch_outcomes()
            .into_iter()
            .map(|(source, (_, missed))| (source, missed))
            .collect()
    }

    /// Counted statements with more than one distinct possible outgoing
    /// arc. Excluded lines and sentinels never qualify.
    fn branch_lines(&self) -> LineSet {
        let Some(arcs) = &self.arcs else {
            return LineSet::new();
        };
        let mut outgoing: BTreeMap<LineNo, u32> = BTreeMap::new();
        for &(source, _) in &arcs.possible {
            *outgoing.entry(source).or_insert(0) += 1;
        }
        outgoing
            .into_iter()
            .filter(|&(source, count)| {
                count > 1 && self.statements.contains(&source) && !self.excluded.contains(&source)
            })
            .map(|(source, _)| source)
            .collect()
    }

    /// Per branch line, the possible targets split into `(taken,
    /// missed)`. Targets come out ascending because the arc set is
    /// ordered.
    fn branch_outcomes(&self) -> BTreeMap<LineNo, (Vec<LineNo>, Vec<LineNo>)> {
        let Some(arcs) = &self.arcs else {
            return BTreeMap::new();
        };
        let branch_lines = self.branch_lines();
        let mut outcomes: BTreeMap<LineNo, (Vec<LineNo>, Vec<LineNo>)> = BTreeMap::new();
        for &(source, target) in &arcs.possible {
            if !branch_lines.contains(&source) {
                continue;
            }
            let (taken, missed) = outcomes.entry(source).or_default();
            if arcs.executed.contains(&(source, target)) {
                taken.push(target);
            } else {
                missed.push(target);
            }
        }
        outcomes
    }
}

/// Flatten a per-source branch-arc map into `(source, target)` pairs,
/// grouped by source and in target order within each source.
///
/// The returned sequence is lazy, finite, and one-shot: it consumes the
/// map and is iterated exactly once per report.
#[must_use]
pub fn flatten_arcs(arcs: BTreeMap<LineNo, Vec<LineNo>>) -> ArcPairs {
    ArcPairs {
        sources: arcs.into_iter(),
        current: None,
    }
}

/// One-shot iterator over flattened branch arcs. See [`flatten_arcs`].
#[derive(Debug)]
pub struct ArcPairs {
    sources: btree_map::IntoIter<LineNo, Vec<LineNo>>,
    current: Option<(LineNo, std::vec::IntoIter<LineNo>)>,
}

impl Iterator for ArcPairs {
    type Item = Arc;

    fn next(&mut self) -> Option<Arc> {
        loop {
            if let Some((source, targets)) = &mut self.current {
                if let Some(target) = targets.next() {
                    return Some((*source, target));
                }
                self.current = None;
            }
            let (source, targets) = self.sources.next()?;
            self.current = Some((source, targets.into_iter()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(nums: &[LineNo]) -> LineSet {
        nums.iter().copied().collect()
    }

    fn arcs(pairs: &[Arc]) -> ArcSet {
        pairs.iter().copied().collect()
    }

    fn line_facts() -> FileFacts {
        FileFacts {
            statements: lines(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]),
            executed: lines(&[1, 2, 3, 4, 5, 6, 7, 8]),
            ..FileFacts::default()
        }
    }

    /// Branch line 5 with possible arcs (5,6) and (5,8), only (5,6) taken.
    fn branch_facts() -> FileFacts {
        FileFacts {
            statements: lines(&[5, 6, 7, 8]),
            executed: lines(&[5, 6, 7]),
            possible_arcs: Some(arcs(&[(5, 6), (5, 8), (6, 7)])),
            executed_arcs: Some(arcs(&[(5, 6), (6, 7)])),
            ..FileFacts::default()
        }
    }

    #[test]
    fn test_missing_is_complement() {
        let analysis = LineAnalysis::from_facts(&line_facts(), false);
        assert_eq!(analysis.missing(), &lines(&[9, 10]));
        let nums = analysis.numbers();
        assert_eq!(nums.n_statements, 10);
        assert_eq!(nums.n_executed, 8);
        assert_eq!(nums.n_missing, 2);
        assert_eq!(nums.pc_covered(), 80.0);
    }

    #[test]
    fn test_partition_invariant() {
        let facts = FileFacts {
            statements: lines(&[1, 2, 3, 4, 5, 6]),
            excluded: lines(&[3, 6]),
            executed: lines(&[1, 2, 3]), // 3 is excluded: must not count
            ..FileFacts::default()
        };
        let analysis = LineAnalysis::from_facts(&facts, false);
        assert_eq!(analysis.executed(), &lines(&[1, 2]));
        assert_eq!(analysis.excluded(), &lines(&[3, 6]));
        assert_eq!(analysis.missing(), &lines(&[4, 5]));

        // statements = executed ⊍ missing ⊍ excluded
        let union: LineSet = analysis
            .executed()
            .iter()
            .chain(analysis.missing())
            .chain(analysis.excluded())
            .copied()
            .collect();
        assert_eq!(&union, analysis.statements());
        assert!(analysis.executed().is_disjoint(analysis.missing()));
        assert!(analysis.executed().is_disjoint(analysis.excluded()));
        assert!(analysis.missing().is_disjoint(analysis.excluded()));

        // Excluded lines leave the denominator entirely.
        let nums = analysis.numbers();
        assert_eq!(nums.n_statements, 4);
        assert_eq!(nums.n_excluded, 2);
        assert_eq!(nums.pc_covered(), 50.0);
    }

    #[test]
    fn test_executed_lines_outside_statements_dropped() {
        let facts = FileFacts {
            statements: lines(&[1, 2]),
            executed: lines(&[1, 2, 99]),
            ..FileFacts::default()
        };
        let analysis = LineAnalysis::from_facts(&facts, false);
        assert_eq!(analysis.executed(), &lines(&[1, 2]));
        assert_eq!(analysis.numbers().pc_covered(), 100.0);
    }

    #[test]
    fn test_partial_branch_line() {
        let analysis = LineAnalysis::from_facts(&branch_facts(), true);
        let nums = analysis.numbers();
        assert_eq!(nums.n_branches, 1);
        assert_eq!(nums.n_partial_branches, 1);
        assert_eq!(nums.n_executed_branches, 0);
        assert_eq!(nums.n_missing_branches, 1);
        assert_eq!(
            analysis.missing_branch_arcs(),
            BTreeMap::from([(5, vec![8])])
        );
        assert_eq!(
            analysis.executed_branch_arcs(),
            BTreeMap::from([(5, vec![6])])
        );
    }

    #[test]
    fn test_fully_taken_branch_line() {
        let mut facts = branch_facts();
        facts.executed_arcs = Some(arcs(&[(5, 6), (5, 8), (6, 7)]));
        let nums = LineAnalysis::from_facts(&facts, true).numbers();
        assert_eq!(nums.n_branches, 1);
        assert_eq!(nums.n_executed_branches, 1);
        assert_eq!(nums.n_partial_branches, 0);
        assert_eq!(nums.n_missing_branches, 0);
    }

    #[test]
    fn test_fully_missed_branch_line_in_neither_bucket() {
        let mut facts = branch_facts();
        facts.executed_arcs = Some(arcs(&[(6, 7)]));
        let nums = LineAnalysis::from_facts(&facts, true).numbers();
        assert_eq!(nums.n_branches, 1);
        assert_eq!(nums.n_executed_branches, 0);
        assert_eq!(nums.n_partial_branches, 0);
        assert_eq!(nums.n_missing_branches, 2);
    }

    #[test]
    fn test_stale_observed_arcs_dropped() {
        let mut facts = branch_facts();
        // (5, 99) is not structurally possible; it must vanish, not count.
        facts.executed_arcs = Some(arcs(&[(5, 6), (5, 99)]));
        let analysis = LineAnalysis::from_facts(&facts, true);
        let nums = analysis.numbers();
        assert_eq!(nums.n_partial_branches, 1);
        assert_eq!(analysis.executed_branch_arcs(), BTreeMap::from([(5, vec![6])]));
    }

    #[test]
    fn test_excluded_line_is_not_a_branch_line() {
        let mut facts = branch_facts();
        facts.excluded = lines(&[5]);
        let nums = LineAnalysis::from_facts(&facts, true).numbers();
        assert_eq!(nums.n_branches, 0);
        assert_eq!(nums.n_missing_branches, 0);
    }

    #[test]
    fn test_sentinel_targets_participate() {
        let facts = FileFacts {
            statements: lines(&[1, 2]),
            executed: lines(&[1]),
            possible_arcs: Some(arcs(&[(1, 2), (1, -1)])),
            executed_arcs: Some(arcs(&[(1, -1)])),
            ..FileFacts::default()
        };
        let analysis = LineAnalysis::from_facts(&facts, true);
        let nums = analysis.numbers();
        assert_eq!(nums.n_branches, 1);
        assert_eq!(nums.n_partial_branches, 1);
        assert_eq!(
            analysis.missing_branch_arcs(),
            BTreeMap::from([(1, vec![2])])
        );
        // The sentinel is never a missing *line*.
        assert_eq!(analysis.missing(), &lines(&[2]));
    }

    #[test]
    fn test_branchless_mode_has_no_arcs() {
        let analysis = LineAnalysis::from_facts(&branch_facts(), false);
        assert!(!analysis.has_arcs());
        assert_eq!(analysis.numbers().n_branches, 0);
    }

    #[test]
    fn test_narrow_keeps_arcs_by_source() {
        // Example: region {5, 6, 7} retains both arcs out of line 5,
        // including (5, 8) whose target lies outside the region.
        let analysis = LineAnalysis::from_facts(&branch_facts(), true);
        let region = analysis.narrow(&lines(&[5, 6, 7]));
        let nums = region.numbers();
        assert_eq!(nums.n_statements, 3);
        assert_eq!(nums.n_branches, 1);
        assert_eq!(nums.n_partial_branches, 1);
        assert_eq!(nums.n_missing_branches, 1);
        assert_eq!(region.missing_branch_arcs(), BTreeMap::from([(5, vec![8])]));
    }

    #[test]
    fn test_narrow_partition_is_additive() {
        let facts = FileFacts {
            statements: lines(&[1, 2, 3, 4, 5, 6]),
            excluded: lines(&[4]),
            executed: lines(&[1, 2, 5]),
            possible_arcs: Some(arcs(&[(2, 3), (2, 5), (5, 6), (5, -1)])),
            executed_arcs: Some(arcs(&[(2, 5), (5, 6), (5, -1)])),
            ..FileFacts::default()
        };
        let full = LineAnalysis::from_facts(&facts, true);
        let a = full.narrow(&lines(&[1, 2, 3]));
        let b = full.narrow(&lines(&[4, 5, 6]));
        assert_eq!(a.numbers() + b.numbers(), full.numbers());
    }

    #[test]
    fn test_narrow_ignores_unknown_lines() {
        let analysis = LineAnalysis::from_facts(&line_facts(), false);
        let region = analysis.narrow(&lines(&[9, 10, 999]));
        assert_eq!(region.numbers().n_statements, 2);
        assert_eq!(region.missing(), &lines(&[9, 10]));
    }

    #[test]
    fn test_flatten_arcs_order() {
        let map = BTreeMap::from([(8, vec![9, -1]), (2, vec![3, 4])]);
        let pairs: Vec<Arc> = flatten_arcs(map).collect();
        assert_eq!(pairs, vec![(2, 3), (2, 4), (8, 9), (8, -1)]);
    }

    #[test]
    fn test_flatten_arcs_empty() {
        assert_eq!(flatten_arcs(BTreeMap::new()).count(), 0);
    }
}
