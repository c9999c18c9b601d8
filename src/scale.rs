use crate::data::Dataframe;
use crate::error::{PlotError, Result};
use log::debug;
use serde::{Deserialize, Serialize};

/// Value range of one axis or column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Position of `value` inside the range as 0..=1. A zero-width range maps
    /// everything to 0.
    pub fn normalize(&self, value: f64) -> f64 {
        let span = self.span();
        if span == 0.0 {
            0.0
        } else {
            (value - self.min) / span
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

/// Bounds of every axis, kept by a plotting session between calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AxisBounds {
    pub x1: Option<Bounds>,
    pub x2: Option<Bounds>,
    pub x3: Option<Bounds>,
    pub color: Option<Bounds>,
}

/// Maps raw column values onto an axis of length `len`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisScale {
    pub bounds: Bounds,
    pub len: f64,
    pub normalize: bool,
}

impl AxisScale {
    pub fn new(bounds: Bounds, len: f64, normalize: bool) -> Self {
        Self { bounds, len, normalize }
    }

    pub fn apply(&self, value: f64) -> f64 {
        if self.normalize {
            self.bounds.normalize(value) * self.len
        } else {
            value
        }
    }
}

/// Min and max of a column over all rows
pub fn get_min_max(
    df: &Dataframe,
    column: usize,
    previous: Option<Bounds>,
    keep_old: bool,
) -> Result<Bounds> {
    min_max_from(df, column, 0, previous, keep_old)
}

/// Min and max of a column, starting at row `first_row`.
///
/// The first scanned value must be numeric, otherwise the column index or the
/// separator is probably wrong. Later non-numeric cells are skipped. With
/// `keep_old` the scan starts from `previous`, so the result only widens.
pub fn min_max_from(
    df: &Dataframe,
    column: usize,
    first_row: usize,
    previous: Option<Bounds>,
    keep_old: bool,
) -> Result<Bounds> {
    if df.len() <= first_row {
        return Err(PlotError::EmptyDataframe);
    }
    df.check_column(column)?;

    let seed_cell = &df.rows[first_row][column];
    let seed = seed_cell
        .as_f64()
        .ok_or_else(|| PlotError::NonNumericSeed {
            column,
            value: seed_cell.to_string(),
        })?;

    let (mut min, mut max) = match previous {
        Some(prev) if keep_old => (prev.min, prev.max),
        _ => (seed, seed),
    };

    for row in &df.rows[first_row..] {
        if let Some(value) = row[column].as_f64() {
            if value < min {
                min = value;
            }
            if value > max {
                max = value;
            }
        }
    }

    debug!("column {} spans [{}, {}]", column, min, max);
    Ok(Bounds { min, max })
}
