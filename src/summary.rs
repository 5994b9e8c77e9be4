/**
 * File: /src/summary.rs
 * Created Date: Thursday, October 16th 2025
 * Author: Zihan
 * -----
 * Last Modified: Friday, 17th October 2025 5:02:48 pm
 * Modified By: Zihan Wu <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2025-10-18		Zihan	Missing-value profile of the input
 * 2025-10-17		Zihan	Stats CSV and cleaned matrix output
 * 2025-10-16		Zihan	Run summary in the log
 */

use crate::matrix::{Axis, DataTable, MatrixIndex};
use crate::search::Incumbent;
use chrono::Local;
use log::{debug, info};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

pub fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// How the missing cells spread over one axis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingProfile {
    pub axis: Axis,
    pub min_frac: f64,
    pub max_frac: f64,
    pub complete: usize,
    /// missing count -> how many rows (or cols) have it
    pub histogram: BTreeMap<usize, usize>,
}

impl MissingProfile {
    pub fn of(matrix: &MatrixIndex, axis: Axis) -> Self {
        Self {
            axis,
            min_frac: matrix.min_frac_missing(axis),
            max_frac: matrix.max_frac_missing(axis),
            complete: matrix.num_all_valid(axis),
            histogram: matrix.missing_histogram(axis),
        }
    }
}

/// Log the shape and missing-value profile of the searched matrix.
pub fn describe_matrix(matrix: &MatrixIndex) {
    let cells = matrix.num_rows() * matrix.num_cols();
    info!(
        "[{}] {} rows x {} cols, {} of {} cells missing",
        timestamp(),
        matrix.num_rows(),
        matrix.num_cols(),
        cells - matrix.num_valid(),
        cells
    );
    for axis in [Axis::Row, Axis::Col] {
        let profile = MissingProfile::of(matrix, axis);
        info!(
            "[{}] Missing per {}: {:.2}% to {:.2}%, {} complete",
            timestamp(),
            axis,
            100.0 * profile.min_frac,
            100.0 * profile.max_frac,
            profile.complete
        );
        debug!("{} missing counts: {:?}", axis, profile.histogram);
    }
}

/// What a finished run reports
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub algorithm: String,
    pub data_file: String,
    pub seconds: f64,
    pub num_rows: usize,
    pub num_cols: usize,
    pub rows_kept: usize,
    pub cols_kept: usize,
    pub valid_elements: usize,
    pub valid_before: usize,
}

impl RunSummary {
    pub fn new(
        algorithm: &str,
        data_file: &str,
        seconds: f64,
        matrix: &MatrixIndex,
        incumbent: &Incumbent,
    ) -> Self {
        Self {
            algorithm: algorithm.to_string(),
            data_file: data_file.to_string(),
            seconds,
            num_rows: matrix.num_rows(),
            num_cols: matrix.num_cols(),
            rows_kept: incumbent.num_rows(),
            cols_kept: incumbent.num_cols(),
            valid_elements: matrix.valid_kept(incumbent.rows_to_keep(), incumbent.cols_to_keep()),
            valid_before: matrix.num_valid(),
        }
    }

    /// `data_file,seconds,0.0,valid_elements,rows,cols`
    pub fn csv_line(&self) -> String {
        format!(
            "{},{:.3},0.0,{},{},{}",
            self.data_file, self.seconds, self.valid_elements, self.rows_kept, self.cols_kept
        )
    }
}

pub fn summarize_results(summary: &RunSummary) {
    let method = &summary.algorithm;
    info!("[method: {}] [{}] Data file: {}", method, timestamp(), summary.data_file);
    info!(
        "[method: {}] [{}] Finished in {:.3}s",
        method,
        timestamp(),
        summary.seconds
    );
    info!(
        "[method: {}] [{}] Kept {} of {} rows, {} of {} cols",
        method,
        timestamp(),
        summary.rows_kept,
        summary.num_rows,
        summary.cols_kept,
        summary.num_cols
    );
    let share = if summary.valid_before == 0 {
        0.0
    } else {
        100.0 * summary.valid_elements as f64 / summary.valid_before as f64
    };
    info!(
        "[method: {}] [{}] Valid elements: {} ({:.2}% of {})",
        method,
        timestamp(),
        summary.valid_elements,
        share,
        summary.valid_before
    );
}

/// Append one CSV line for this run to `path`.
pub fn write_stats_to_file<P: AsRef<Path>>(path: P, summary: &RunSummary) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", summary.csv_line())
}

/// `<dir>/<stem>_cleaned.tsv` next to the input file
pub fn cleaned_file_name<P: AsRef<Path>>(data_file: P) -> PathBuf {
    let data_file = data_file.as_ref();
    let stem = data_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "data".to_string());
    data_file.with_file_name(format!("{}_cleaned.tsv", stem))
}

/// Write the kept rows and columns of `table`, headers included.
pub fn write_cleaned_matrix<P: AsRef<Path>>(
    path: P,
    table: &DataTable,
    incumbent: &Incumbent,
) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    table.write_kept(&mut out, incumbent.rows_to_keep(), incumbent.cols_to_keep())?;
    out.flush()
}
