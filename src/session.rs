//! State kept between plot calls: axis bounds, known labels and the bar
//! grid. With `keep_old_plot` a call extends that state; without it the
//! session starts over.

use crate::binning::BinCell;
use crate::colormap::{get_color_map, ColorRequest, LabelMap};
use crate::data::Dataframe;
use crate::error::{PlotError, Result};
use crate::grid::Grid;
use crate::ir::PlotOutput;
use crate::scale::{get_min_max, AxisBounds};
use crate::transform::{axis_scales, build_geometry, extract_points, resolve_columns};
use crate::PlotOptions;
use log::{debug, info};
use std::borrow::Cow;

#[derive(Debug, Clone, Default)]
pub struct PlottingSession {
    bounds: AxisBounds,
    labels: LabelMap,
    bar_grid: Option<Grid<BinCell>>,
    plots: usize,
}

impl PlottingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bounds(&self) -> &AxisBounds {
        &self.bounds
    }

    pub fn labels(&self) -> &LabelMap {
        &self.labels
    }

    /// Plot calls since the session was created or cleared
    pub fn plot_count(&self) -> usize {
        self.plots
    }

    /// Forget everything earlier plots left behind
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Main entry point: turn a dataframe into geometry.
    ///
    /// Rows are colored first since the color classification may discover
    /// that row 0 is a header line; that row is dropped before any axis is
    /// scaled.
    pub fn plot(&mut self, df: &Dataframe, options: &PlotOptions) -> Result<PlotOutput> {
        let mut df = Cow::Borrowed(df);
        if options.header && df.headers.is_none() {
            df.to_mut().strip_first_row();
        }
        if df.is_empty() {
            return Err(PlotError::EmptyDataframe);
        }

        let columns = resolve_columns(&df, options)?;
        let keep_old = options.keep_old_plot;
        if !keep_old {
            self.clear();
        }

        let request = ColorRequest::from_options(options);
        let mut color_map = get_color_map(&df, &request, &self.labels, self.bounds.color)?;
        if color_map.header_detected {
            info!("treating the first row as a header line");
            df.to_mut().strip_first_row();
            if !color_map.colors.is_empty() {
                color_map.colors.remove(0);
            }
            if df.is_empty() {
                return Err(PlotError::EmptyDataframe);
            }
        }

        let bounds = AxisBounds {
            x1: Some(get_min_max(&df, columns.x1, self.bounds.x1, keep_old)?),
            x2: Some(get_min_max(&df, columns.x2, self.bounds.x2, keep_old)?),
            x3: Some(get_min_max(&df, columns.x3, self.bounds.x3, keep_old)?),
            color: color_map.bounds.or(if keep_old { self.bounds.color } else { None }),
        };

        let scales = axis_scales(&bounds, options);
        let points = extract_points(&df, &columns, &scales, &color_map.colors);
        debug!("{} of {} rows placed", points.len(), df.len());

        let previous_bars = if keep_old { self.bar_grid.take() } else { None };
        let (geometry, bar_grid) = build_geometry(points, options, color_map.kind, previous_bars);

        self.bounds = bounds;
        self.labels = color_map.labels;
        if bar_grid.is_some() {
            self.bar_grid = bar_grid;
        }
        self.plots += 1;

        Ok(PlotOutput {
            geometry,
            bounds,
            color_kind: color_map.kind,
            labels: self.labels.iter().cloned().collect(),
            header_detected: color_map.header_detected,
        })
    }
}
