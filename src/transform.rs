use crate::binning::{BarAccumulator, BinCell};
use crate::color::{heat_color, Color};
use crate::colormap::ColumnKind;
use crate::data::Dataframe;
use crate::error::{PlotError, Result};
use crate::evaluator::FormulaSession;
use crate::grid::Grid;
use crate::interpolate::{assign_nearest, fill_gaps, SurfaceSample};
use crate::ir::{BarChart, Geometry, PlotOutput, PlotPoint, PointCloud, SurfaceGrid};
use crate::scale::{AxisBounds, AxisScale, Bounds};
use crate::som::som_smooth;
use crate::{Dimensions, Interpolation, PlotMode, PlotOptions};
use log::{debug, warn};

/// Column indices of the three axes, checked against the dataframe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisColumns {
    pub x1: usize,
    pub x2: usize,
    pub x3: usize,
}

/// Scales taking raw column values to scene coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scales {
    pub x1: AxisScale,
    pub x2: AxisScale,
    pub x3: AxisScale,
}

/// Every axis needs a column and every column must exist
pub fn resolve_columns(df: &Dataframe, options: &PlotOptions) -> Result<AxisColumns> {
    let columns = &options.columns;
    let x1 = columns.x1.ok_or(PlotError::MissingColumn { axis: "x1" })?;
    let x2 = columns.x2.ok_or(PlotError::MissingColumn { axis: "x2" })?;
    let x3 = columns.x3.ok_or(PlotError::MissingColumn { axis: "x3" })?;
    for column in [x1, x2, x3] {
        df.check_column(column)?;
    }
    Ok(AxisColumns { x1, x2, x3 })
}

/// Build the axis scales. Grid based modes always map x1 and x3 onto the
/// grid domain; the height axis follows the `normalize` option.
pub fn axis_scales(bounds: &AxisBounds, options: &PlotOptions) -> Scales {
    let dims = &options.dimensions;
    let grid_mode = matches!(options.mode, PlotMode::Barchart | PlotMode::Polygon);
    let horizontal = options.normalize || grid_mode;
    let scale = |b: Option<Bounds>, len: f64, normalize: bool| {
        AxisScale::new(b.unwrap_or(Bounds::new(0.0, len)), len, normalize)
    };
    Scales {
        x1: scale(bounds.x1, dims.x_len, horizontal),
        x2: scale(bounds.x2, dims.y_len, options.normalize),
        x3: scale(bounds.x3, dims.z_len, horizontal),
    }
}

/// Place every row in the scene. Rows with a non-numeric axis value, or one
/// that scales to a non-finite coordinate, are skipped.
pub fn extract_points(
    df: &Dataframe,
    columns: &AxisColumns,
    scales: &Scales,
    colors: &[Color],
) -> Vec<PlotPoint> {
    let mut points = Vec::with_capacity(df.len());

    for (row, cells) in df.rows.iter().enumerate() {
        let values = (
            cells[columns.x1].as_f64(),
            cells[columns.x2].as_f64(),
            cells[columns.x3].as_f64(),
        );
        let (Some(x1), Some(x2), Some(x3)) = values else {
            warn!("row {}: non-numeric axis value, skipping", row);
            continue;
        };
        let (x, y, z) = (scales.x1.apply(x1), scales.x2.apply(x2), scales.x3.apply(x3));
        if !(x.is_finite() && y.is_finite() && z.is_finite()) {
            warn!("row {}: axis value does not scale to a finite coordinate, skipping", row);
            continue;
        }
        points.push(PlotPoint {
            x,
            y,
            z,
            color: colors.get(row).copied().unwrap_or(Color::WHITE),
            row,
        });
    }

    points
}

/// Dispatch on the plot mode
pub fn build_geometry(
    points: Vec<PlotPoint>,
    options: &PlotOptions,
    color_kind: ColumnKind,
    previous_bars: Option<Grid<BinCell>>,
) -> (Geometry, Option<Grid<BinCell>>) {
    match options.mode {
        PlotMode::Scatterplot => (
            Geometry::Points(PointCloud {
                points,
                connected: false,
            }),
            None,
        ),
        PlotMode::Lineplot => (
            Geometry::Points(PointCloud {
                points,
                connected: true,
            }),
            None,
        ),
        PlotMode::Barchart => {
            let row_colors = color_kind != ColumnKind::Absent;
            let (chart, grid) = build_bars(&points, options, row_colors, previous_bars);
            (Geometry::Bars(chart), Some(grid))
        }
        PlotMode::Polygon => (Geometry::Surface(build_surface(&points, options)), None),
    }
}

/// Splat the points into bars. A previous grid of the same shape keeps
/// accumulating; row colors are blended per bar when `row_colors` is set.
pub fn build_bars(
    points: &[PlotPoint],
    options: &PlotOptions,
    row_colors: bool,
    previous: Option<Grid<BinCell>>,
) -> (BarChart, Grid<BinCell>) {
    let dims = &options.dimensions;
    let mut acc = match previous {
        Some(grid) if grid.x_cells() == dims.x_cells() && grid.z_cells() == dims.z_cells() => {
            debug!("adding to the previous bar grid");
            BarAccumulator::resume(grid, dims)
        }
        _ => BarAccumulator::new(dims),
    };

    for p in points {
        acc.splat(p.x, p.z, p.y, row_colors.then_some(p.color));
    }

    let chart = acc.finish(
        dims,
        options.barchart_padding,
        options.bar_size_threshold,
        options.hue_offset,
    );
    (chart, acc.into_grid())
}

/// Reconstruct a surface from the points with the configured interpolation
pub fn build_surface(points: &[PlotPoint], options: &PlotOptions) -> SurfaceGrid {
    let dims = &options.dimensions;
    let samples: Vec<SurfaceSample> = points
        .iter()
        .map(|p| SurfaceSample {
            x: p.x,
            z: p.z,
            height: p.y,
        })
        .collect();

    let heights = match options.interpolation {
        Interpolation::Gapfill => fill_gaps(&assign_nearest(&samples, dims), dims),
        Interpolation::Som => som_smooth(&samples, dims, options.som_epochs, options.som_radius),
    };
    surface_from_heights(&heights, dims, options.hue_offset)
}

/// Wrap a height grid, coloring each vertex by its relative height
pub fn surface_from_heights(
    heights: &Grid<f64>,
    dims: &Dimensions,
    hue_offset: f64,
) -> SurfaceGrid {
    let range = heights
        .values()
        .fold(None, |acc: Option<Bounds>, &h| match acc {
            Some(b) => Some(b.union(&Bounds::new(h, h))),
            None => Some(Bounds::new(h, h)),
        })
        .unwrap_or(Bounds::new(0.0, 0.0));

    let colors = heights.map(|&h| heat_color(range.normalize(h), hue_offset));
    SurfaceGrid {
        x_cells: heights.x_cells(),
        z_cells: heights.z_cells(),
        x_step: 1.0 / dims.x_res as f64,
        z_step: 1.0 / dims.z_res as f64,
        heights: heights.to_nested(),
        colors: colors.to_nested(),
    }
}

/// Main entry point for formulas: sample the session's formula on every grid
/// vertex and turn it into a surface. Undefined values (NaN, infinities) are
/// filled like gaps in data.
pub fn plot_formula(session: &mut FormulaSession, options: &PlotOptions) -> PlotOutput {
    let dims = *session.dimensions();
    let (x_cells, z_cells) = (dims.x_cells(), dims.z_cells());

    let mut raw: Grid<Option<f64>> = Grid::new(x_cells, z_cells, None);
    for i in 0..x_cells {
        for k in 0..z_cells {
            let x1 = i as f64 / dims.x_res as f64;
            let x3 = k as f64 / dims.z_res as f64;
            let value = session.evaluate(x1, x3);
            raw[(i, k)] = value.is_finite().then_some(value);
        }
    }

    let undefined = raw.values().filter(|v| v.is_none()).count();
    if undefined > 0 {
        debug!("{} vertices undefined, filling them", undefined);
    }

    let value_bounds = raw
        .values()
        .flatten()
        .fold(None, |acc: Option<Bounds>, &v| match acc {
            Some(b) => Some(b.union(&Bounds::new(v, v))),
            None => Some(Bounds::new(v, v)),
        });

    let scaled = match value_bounds {
        Some(bounds) if options.normalize => {
            let scale = AxisScale::new(bounds, dims.y_len, true);
            raw.map(|v| v.map(|v| scale.apply(v)))
        }
        _ => raw,
    };

    let heights = fill_gaps(&scaled, &dims);
    PlotOutput {
        geometry: Geometry::Surface(surface_from_heights(&heights, &dims, options.hue_offset)),
        bounds: AxisBounds {
            x1: Some(Bounds::new(0.0, dims.x_len)),
            x2: value_bounds,
            x3: Some(Bounds::new(0.0, dims.z_len)),
            color: value_bounds,
        },
        color_kind: ColumnKind::Heatmap,
        labels: Vec::new(),
        header_detected: false,
    }
}
