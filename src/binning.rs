//! Bar aggregation: scattered points are splatted bilinearly onto the grid
//! nodes around them.

use crate::color::{heat_color, Color};
use crate::grid::Grid;
use crate::ir::{Bar, BarChart};
use crate::Dimensions;
use log::debug;

/// Offsets below this count as sitting exactly on a node
const NODE_EPSILON: f64 = 1e-9;

/// Accumulated contributions of one grid node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BinCell {
    /// Weighted height sum
    pub sum: f64,
    /// Sum of the bilinear weights
    pub weight: f64,
    /// Points that touched this node
    pub samples: usize,
    /// Weighted average of the contributing colors
    pub color: Option<Color>,
    color_weight: f64,
}

impl BinCell {
    pub fn add(&mut self, height: f64, weight: f64, color: Option<Color>) {
        self.sum += height * weight;
        self.weight += weight;
        self.samples += 1;

        if let Some(c) = color {
            let total = self.color_weight + weight;
            self.color = Some(match self.color {
                Some(existing) if total > 0.0 => existing.lerp(&c, weight / total),
                _ => c,
            });
            self.color_weight = total;
        }
    }
}

/// Bilinear splat weights of a point at fractional grid position (fx, fz).
/// Returns the nodes with a nonzero share; the shares sum to 1.
pub fn bilinear_weights(fx: f64, fz: f64) -> Vec<((usize, usize), f64)> {
    let i = fx.floor().max(0.0);
    let k = fz.floor().max(0.0);
    let mut dx = fx - i;
    let mut dz = fz - k;
    if dx < NODE_EPSILON {
        dx = 0.0;
    }
    if dz < NODE_EPSILON {
        dz = 0.0;
    }
    let (i, k) = (i as usize, k as usize);

    if dx == 0.0 && dz == 0.0 {
        return vec![((i, k), 1.0)];
    }

    [
        ((i, k), (1.0 - dx) * (1.0 - dz)),
        ((i + 1, k), dx * (1.0 - dz)),
        ((i, k + 1), (1.0 - dx) * dz),
        ((i + 1, k + 1), dx * dz),
    ]
    .into_iter()
    .filter(|(_, w)| *w > 0.0)
    .collect()
}

/// Splats points onto a grid of `BinCell`s
#[derive(Debug, Clone)]
pub struct BarAccumulator {
    grid: Grid<BinCell>,
    x_res: f64,
    z_res: f64,
}

impl BarAccumulator {
    pub fn new(dims: &Dimensions) -> Self {
        Self {
            grid: Grid::new(dims.x_cells(), dims.z_cells(), BinCell::default()),
            x_res: dims.x_res as f64,
            z_res: dims.z_res as f64,
        }
    }

    /// Continue accumulating into an existing grid
    pub fn resume(grid: Grid<BinCell>, dims: &Dimensions) -> Self {
        Self {
            grid,
            x_res: dims.x_res as f64,
            z_res: dims.z_res as f64,
        }
    }

    pub fn grid(&self) -> &Grid<BinCell> {
        &self.grid
    }

    pub fn into_grid(self) -> Grid<BinCell> {
        self.grid
    }

    /// Add a point at axis position (x, z). Shares that would land past the
    /// last node are dropped (their weight is 0 at the far edge anyway).
    pub fn splat(&mut self, x: f64, z: f64, height: f64, color: Option<Color>) {
        for ((i, k), w) in bilinear_weights(x * self.x_res, z * self.z_res) {
            if let Some(cell) = self.grid.get_mut(i, k) {
                cell.add(height, w, color);
            }
        }
    }

    /// Turn accumulated sums into bars. The tallest absolute sum becomes
    /// `dims.y_len`; bars below `threshold` of it are hidden. Without blended
    /// label colors a bar is colored by its height.
    pub fn finish(
        &self,
        dims: &Dimensions,
        padding: f64,
        threshold: f64,
        hue_offset: f64,
    ) -> BarChart {
        let (min, max) = self
            .grid
            .values()
            .filter(|c| c.samples > 0)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
                (lo.min(c.sum), hi.max(c.sum))
            });
        let largest = min.abs().max(max.abs());
        let factor = if largest.is_finite() && largest > 0.0 {
            dims.y_len / largest
        } else {
            0.0
        };

        let mut bars = Vec::new();
        let mut hidden = 0;
        for ((i, k), cell) in self.grid.iter() {
            if cell.samples == 0 {
                continue;
            }
            let relative = if largest > 0.0 { cell.sum.abs() / largest } else { 0.0 };
            if relative < threshold || factor == 0.0 {
                hidden += 1;
                continue;
            }
            let color = cell
                .color
                .unwrap_or_else(|| heat_color(relative, hue_offset));
            bars.push(Bar {
                x_index: i,
                z_index: k,
                x: i as f64 / self.x_res,
                z: k as f64 / self.z_res,
                height: cell.sum * factor,
                samples: cell.samples,
                color,
            });
        }

        debug!("{} bars visible, {} hidden below threshold", bars.len(), hidden);
        let padding = padding.clamp(0.0, 0.99);
        BarChart {
            bars,
            hidden,
            bar_width: (1.0 - padding) / self.x_res,
            bar_depth: (1.0 - padding) / self.z_res,
            largest_sum: if largest.is_finite() { largest } else { 0.0 },
        }
    }
}
