//! Console report for one comparison.

use std::io::{self, Write};

use otsparse::api::{Comparison, SolveStatus};

pub fn write_header<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "Running Sinkhorn...")
}

/// Everything after the progress header, in run order.
pub fn write_report<W: Write>(out: &mut W, cmp: &Comparison) -> io::Result<()> {
    writeln!(out, "Sinkhorn cost: {:.6}", cmp.dense.cost)?;
    writeln!(out, "Sparse graph has {} edges", cmp.sparse_edges)?;
    writeln!(out, "Running sparse EMD...")?;
    writeln!(out, "Sparse EMD cost: {:.6}", cmp.exact.cost)?;
    if cmp.exact.status != SolveStatus::Optimal {
        writeln!(out, "Sparse EMD status: {}", cmp.exact.status)?;
    }
    writeln!(out)?;
    writeln!(out, "Cost difference: {:.6}", cmp.abs_diff())?;
    match cmp.rel_diff_pct() {
        Some(pct) => writeln!(out, "Relative difference: {pct:.2}%"),
        None => writeln!(out, "Relative difference: n/a"),
    }
}

/// Statuses that make the run fail after the report is printed.
pub fn is_fatal(status: SolveStatus) -> bool {
    matches!(status, SolveStatus::Infeasible | SolveStatus::Unbounded)
}
