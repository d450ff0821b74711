//! Aggregate coverage metrics with exact merge semantics.

use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Aggregate counts for one analyzed extent: a file, a region, or a
/// whole run.
///
/// Merging is field-wise integer addition. The covered percentage is not
/// additive and is always recomputed from the summed counts, so a total
/// is the ratio of sums, never the sum (or average) of ratios.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Numbers {
    pub n_statements: u64,
    pub n_executed: u64,
    pub n_missing: u64,
    pub n_excluded: u64,
    pub n_branches: u64,
    pub n_executed_branches: u64,
    pub n_partial_branches: u64,
    pub n_missing_branches: u64,
}

impl Numbers {
    /// Percent of statements covered. An extent with no statements is
    /// fully covered by definition.
    #[must_use]
    pub fn pc_covered(&self) -> f64 {
        if self.n_statements == 0 {
            100.0
        } else {
            100.0 * self.n_executed as f64 / self.n_statements as f64
        }
    }

    /// Display form of [`pc_covered`](Self::pc_covered) with `precision`
    /// decimal digits.
    #[must_use]
    pub fn pc_covered_str(&self, precision: usize) -> String {
        display_covered(self.pc_covered(), precision)
    }
}

impl Add for Numbers {
    type Output = Numbers;

    fn add(self, other: Numbers) -> Numbers {
        Numbers {
            n_statements: self.n_statements + other.n_statements,
            n_executed: self.n_executed + other.n_executed,
            n_missing: self.n_missing + other.n_missing,
            n_excluded: self.n_excluded + other.n_excluded,
            n_branches: self.n_branches + other.n_branches,
            n_executed_branches: self.n_executed_branches + other.n_executed_branches,
            n_partial_branches: self.n_partial_branches + other.n_partial_branches,
            n_missing_branches: self.n_missing_branches + other.n_missing_branches,
        }
    }
}

impl AddAssign for Numbers {
    fn add_assign(&mut self, other: Numbers) {
        *self = *self + other;
    }
}

impl Sum for Numbers {
    fn sum<I: Iterator<Item = Numbers>>(iter: I) -> Numbers {
        iter.fold(Numbers::default(), Add::add)
    }
}

/// Format a percentage with `precision` decimal digits, keeping the
/// result strictly inside the 0/100 boundaries unless the value exactly
/// equals them.
///
/// A value that would round up to the literal "100" (or down to "0")
/// without genuinely being 100% (or 0%) is clamped to the nearest
/// representable non-boundary value instead: 99.96% at precision 1
/// displays as "99.9", 0.04% as "0.1".
#[must_use]
pub fn display_covered(pc: f64, precision: usize) -> String {
    let near0 = 1.0 / 10f64.powi(precision as i32);
    let pc = if 0.0 < pc && pc < near0 {
        near0
    } else if 100.0 - near0 < pc && pc < 100.0 {
        100.0 - near0
    } else {
        pc
    };
    format!("{pc:.precision$}")
}
