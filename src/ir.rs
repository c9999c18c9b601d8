use crate::color::Color;
use crate::colormap::{ColumnKind, LabelEntry};
use crate::scale::AxisBounds;
use serde::Serialize;

// =============================================================================
// Phase 1: Samples
// =============================================================================

/// One dataframe row placed in scene coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlotPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub color: Color,
    /// Row in the (header-stripped) dataframe
    pub row: usize,
}

// =============================================================================
// Phase 2: Geometry
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointCloud {
    pub points: Vec<PlotPoint>,
    /// Consecutive points are joined by line segments
    pub connected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub x_index: usize,
    pub z_index: usize,
    /// Base of the bar in axis units
    pub x: f64,
    pub z: f64,
    /// Signed height, scaled so the tallest bar reaches the y axis length
    pub height: f64,
    pub samples: usize,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChart {
    /// Visible bars only
    pub bars: Vec<Bar>,
    /// Occupied cells hidden below the size threshold
    pub hidden: usize,
    pub bar_width: f64,
    pub bar_depth: f64,
    /// Largest absolute accumulated height before scaling
    pub largest_sum: f64,
}

/// Height field over the grid vertices, indexed `[x][z]`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurfaceGrid {
    pub x_cells: usize,
    pub z_cells: usize,
    /// Distance between neighboring vertices in axis units
    pub x_step: f64,
    pub z_step: f64,
    pub heights: Vec<Vec<f64>>,
    pub colors: Vec<Vec<Color>>,
}

impl SurfaceGrid {
    pub fn height(&self, i: usize, k: usize) -> Option<f64> {
        self.heights.get(i).and_then(|col| col.get(k)).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Geometry {
    Points(PointCloud),
    Bars(BarChart),
    Surface(SurfaceGrid),
}

// =============================================================================
// Phase 3: Output
// =============================================================================

/// Everything a renderer needs for one plot call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotOutput {
    pub geometry: Geometry,
    pub bounds: AxisBounds,
    pub color_kind: ColumnKind,
    /// Known labels in legend order
    pub labels: Vec<LabelEntry>,
    /// The first input row was taken as a header line
    pub header_detected: bool,
}

impl PlotOutput {
    pub fn points(&self) -> Option<&PointCloud> {
        match &self.geometry {
            Geometry::Points(p) => Some(p),
            _ => None,
        }
    }

    pub fn bars(&self) -> Option<&BarChart> {
        match &self.geometry {
            Geometry::Bars(b) => Some(b),
            _ => None,
        }
    }

    pub fn surface(&self) -> Option<&SurfaceGrid> {
        match &self.geometry {
            Geometry::Surface(s) => Some(s),
            _ => None,
        }
    }
}
