//! Surface reconstruction from scattered samples.
//!
//! Every sample is assigned to the cell it falls in (averaging collisions).
//! Rows along x are then filled: short gaps linearly, long gaps and edge runs
//! by letting the neighbors sag toward the lowest sampled height. A final
//! pass along z fills what the rows left, which is only rows without any
//! sample.

use crate::grid::{truncate_to_cell, Grid};
use crate::Dimensions;
use log::{debug, warn};

/// A point of the surface in axis units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSample {
    pub x: f64,
    pub z: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FillMode {
    DecayToFloor { floor: f64, threshold: usize },
    Linear,
}

/// Longest gap (in cells) bridged by a straight line at resolution `res`
pub fn gap_threshold(res: usize) -> usize {
    (res / 4).max(2)
}

/// Average of the samples falling into each cell, `None` where none did
pub fn assign_nearest(samples: &[SurfaceSample], dims: &Dimensions) -> Grid<Option<f64>> {
    let (x_cells, z_cells) = (dims.x_cells(), dims.z_cells());
    let mut sums: Grid<(f64, usize)> = Grid::new(x_cells, z_cells, (0.0, 0));

    for s in samples {
        if !s.height.is_finite() {
            continue;
        }
        let i = truncate_to_cell(s.x, dims.x_res, x_cells);
        let k = truncate_to_cell(s.z, dims.z_res, z_cells);
        let cell = &mut sums[(i, k)];
        cell.0 += s.height;
        cell.1 += 1;
    }

    sums.map(|&(sum, n)| if n > 0 { Some(sum / n as f64) } else { None })
}

/// Fill every undefined cell. A grid without any defined cell becomes flat 0.
pub fn fill_gaps(grid: &Grid<Option<f64>>, dims: &Dimensions) -> Grid<f64> {
    let Some(floor) = grid
        .values()
        .flatten()
        .copied()
        .reduce(f64::min)
    else {
        warn!("surface has no samples; using a flat surface");
        return grid.map(|_| 0.0);
    };

    let mut grid = grid.clone();
    let row_mode = FillMode::DecayToFloor {
        floor,
        threshold: gap_threshold(dims.x_res),
    };
    let mut empty_rows = 0;
    for k in 0..grid.z_cells() {
        let mut line = grid.row(k);
        if fill_line(&mut line, row_mode) {
            grid.set_row(k, &line);
        } else {
            empty_rows += 1;
        }
    }

    if empty_rows > 0 {
        debug!("{} rows without samples, filling along z", empty_rows);
        for i in 0..grid.x_cells() {
            let mut line = grid.column(i);
            fill_line(&mut line, FillMode::Linear);
            grid.set_column(i, &line);
        }
    }

    grid.map(|v| v.unwrap_or(floor))
}

/// Fill the `None` runs of one line. Returns false if nothing was defined.
fn fill_line(line: &mut [Option<f64>], mode: FillMode) -> bool {
    let defined: Vec<(usize, f64)> = line
        .iter()
        .enumerate()
        .filter_map(|(j, v)| v.map(|v| (j, v)))
        .collect();
    let (Some(&(first, first_value)), Some(&(last, last_value))) = (defined.first(), defined.last())
    else {
        return false;
    };

    for j in 0..first {
        line[j] = Some(edge_value(first_value, first - j, mode));
    }
    for j in last + 1..line.len() {
        line[j] = Some(edge_value(last_value, j - last, mode));
    }

    for pair in defined.windows(2) {
        let (a_idx, a) = pair[0];
        let (b_idx, b) = pair[1];
        let gap = b_idx - a_idx - 1;
        if gap == 0 {
            continue;
        }
        let span = (b_idx - a_idx) as f64;
        for j in a_idx + 1..b_idx {
            let value = match mode {
                FillMode::DecayToFloor { floor, threshold } if gap >= threshold => {
                    floor
                        + (a - floor) * falloff(j - a_idx, threshold)
                        + (b - floor) * falloff(b_idx - j, threshold)
                }
                _ => a + (b - a) * (j - a_idx) as f64 / span,
            };
            line[j] = Some(value);
        }
    }
    true
}

fn edge_value(neighbor: f64, distance: usize, mode: FillMode) -> f64 {
    match mode {
        FillMode::DecayToFloor { floor, threshold } => {
            floor + (neighbor - floor) * falloff(distance, threshold)
        }
        FillMode::Linear => neighbor,
    }
}

/// Share of a neighbor's height left `distance` cells away; 0 from `threshold` on
fn falloff(distance: usize, threshold: usize) -> f64 {
    let t = (distance as f64 / threshold as f64).min(1.0);
    (1.0 - t) * (1.0 - t)
}
