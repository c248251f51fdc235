//! The rollup engine: derives a parent's progress from its children.
//!
//! This is a pure function over a snapshot of child values. It never touches
//! storage, never fails, and is deterministic and order-independent, so the
//! service layer can re-run it as often as it likes — recomputing twice over
//! an unchanged snapshot yields an identical result.
//!
//! # The done_ratio rule
//!
//! Children are weighted by estimated effort: a 7-hour task moves the
//! parent's progress more than a 1-hour one. Two details make the rule less
//! obvious than a plain weighted mean:
//!
//! - A closed child counts as fully done regardless of its recorded ratio
//!   (recorded ratios on closed items go stale).
//! - A child without a usable estimate (absent, or zero) cannot be left out
//!   of the aggregate entirely — an unestimated half-done task still
//!   represents progress. Such children are assigned the *average* of the
//!   positive estimates as a stand-in weight, and the denominator is that
//!   average times the child count. When no child has a positive estimate
//!   the rule degenerates to the plain unweighted mean, which we branch to
//!   explicitly.
//!
//! An earlier implementation summed child weights into the denominator
//! instead of using `average * count`, which over- or under-counted items
//! whose estimates were zero or absent (it could report 133% done). The
//! regression cases live in `tests/rollup_spec.rs`.

use serde::{Deserialize, Serialize};

/// Read-only snapshot of one child, carrying exactly the fields the rollup
/// rule looks at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChildProgress {
    /// Whether the child's status is a closed classification.
    pub closed: bool,
    /// Estimated effort in hours. `None` ("not estimated") is distinct from
    /// `Some(0.0)`: a zero estimate still counts as present for the
    /// estimated-hours sum, but neither provides a usable weight.
    pub estimated_hours: Option<f64>,
    /// Recorded completion percentage, 0–100. Ignored when `closed`.
    pub done_ratio: u8,
}

/// The derived parent fields produced by [`rollup`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rollup {
    /// Aggregated completion percentage, 0–100.
    pub done_ratio: u8,
    /// Sum of the children's estimates, or `None` when no child has one.
    pub estimated_hours: Option<f64>,
}

/// Compute a parent's derived `(done_ratio, estimated_hours)` from a snapshot
/// of its direct children.
///
/// Always succeeds; an empty snapshot yields `0` / `None`.
pub fn rollup(children: &[ChildProgress]) -> Rollup {
    Rollup {
        done_ratio: aggregate_done_ratio(children),
        estimated_hours: total_estimated_hours(children),
    }
}

/// Sum of present estimates, or `None` when every child is unestimated.
///
/// A `Some(0.0)` estimate keeps the total present even though it adds
/// nothing; only all-absent collapses the total to `None`.
fn total_estimated_hours(children: &[ChildProgress]) -> Option<f64> {
    let present: Vec<f64> = children.iter().filter_map(|c| c.estimated_hours).collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum())
    }
}

fn aggregate_done_ratio(children: &[ChildProgress]) -> u8 {
    if children.is_empty() {
        return 0;
    }

    let positive: Vec<f64> = children
        .iter()
        .filter_map(|c| c.estimated_hours)
        .filter(|h| *h > 0.0)
        .collect();

    let count = children.len() as f64;

    let (done, denominator) = if positive.is_empty() {
        // No usable weights anywhere: plain unweighted mean of completions.
        let done: f64 = children.iter().map(completion).sum();
        (done, count)
    } else {
        let average: f64 = positive.iter().sum::<f64>() / positive.len() as f64;
        let done: f64 = children
            .iter()
            .map(|c| weight(c, average) * completion(c))
            .sum();
        (done, average * count)
    };

    // Multiply before dividing so documented boundaries (87.5, 42.5) land
    // exactly on .5 and round half-up.
    let percent = (done * 100.0 / denominator).round();
    percent.clamp(0.0, 100.0) as u8
}

/// Effective completion of a child in [0, 1]. Closed forces 1 regardless of
/// the recorded ratio; recorded ratios are clamped defensively.
fn completion(child: &ChildProgress) -> f64 {
    if child.closed {
        1.0
    } else {
        f64::from(child.done_ratio.min(100)) / 100.0
    }
}

/// Weight of a child: its own estimate when positive, otherwise the average
/// positive estimate stands in.
fn weight(child: &ChildProgress, average: f64) -> f64 {
    match child.estimated_hours {
        Some(h) if h > 0.0 => h,
        _ => average,
    }
}
