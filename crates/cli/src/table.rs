//! Sweep results as a polars table.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use otsparse::api::Comparison;
use polars::prelude::*;

/// One row per `k`.
pub fn sweep_frame(rows: &[Comparison]) -> PolarsResult<DataFrame> {
    let col_u64 = |f: fn(&Comparison) -> usize| -> Vec<u64> {
        rows.iter().map(|r| f(r) as u64).collect()
    };
    let col_f64 = |f: fn(&Comparison) -> f64| -> Vec<f64> { rows.iter().map(f).collect() };
    df!(
        "k" => col_u64(|r| r.k),
        "edges" => col_u64(|r| r.sparse_edges),
        "candidates" => col_u64(|r| r.candidates),
        "empty_rows" => col_u64(|r| r.coverage.empty_rows.len()),
        "empty_cols" => col_u64(|r| r.coverage.empty_cols.len()),
        "dense_cost" => col_f64(|r| r.dense.cost),
        "sparse_cost" => col_f64(|r| r.exact.cost),
        "status" => rows.iter().map(|r| r.exact.status.to_string()).collect::<Vec<_>>(),
        "iterations" => col_u64(|r| r.exact.iterations),
        "abs_diff" => col_f64(Comparison::abs_diff),
        "rel_diff_pct" => rows.iter().map(Comparison::rel_diff_pct).collect::<Vec<_>>(),
        "plan_ms" => col_f64(|r| r.timings.plan_ms),
        "sparsify_ms" => col_f64(|r| r.timings.sparsify_ms),
        "simplex_ms" => col_f64(|r| r.timings.simplex_ms)
    )
}

/// Write `df` as parquet when `path` ends in `.parquet`, CSV otherwise.
pub fn write_table(path: &Path, df: &mut DataFrame) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    let mut file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    if path.extension().is_some_and(|e| e == "parquet") {
        ParquetWriter::new(&mut file)
            .finish(df)
            .with_context(|| format!("writing {}", path.display()))?;
    } else {
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(df)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}
