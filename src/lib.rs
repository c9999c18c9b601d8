// Library exports for gramsurface

pub mod binning;
pub mod color;
pub mod colormap;
pub mod data;
pub mod error;
pub mod evaluator;
pub mod formula;
pub mod grid;
pub mod interpolate;
pub mod ir;
pub mod parser;
pub mod preprocessor;
pub mod scale;
pub mod session;
pub mod som;
pub mod special;
pub mod transform;

pub use data::{Cell, Dataframe};
pub use error::{PlotError, Result};
pub use evaluator::FormulaSession;
pub use formula::{parse, try_parse, Formula};
pub use ir::{Geometry, PlotOutput};
pub use session::PlottingSession;
pub use transform::plot_formula;

use serde::{Deserialize, Deserializer, Serialize};

/// How the dataframe is turned into geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlotMode {
    #[default]
    Scatterplot,
    Lineplot,
    Barchart,
    Polygon,
}

/// How a surface is reconstructed from scattered samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    #[default]
    Gapfill,
    Som,
}

/// Axis lengths (scene units) and grid resolution (cells per unit)
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Dimensions {
    #[serde(default = "default_len")]
    pub x_len: f64,
    #[serde(default = "default_len")]
    pub y_len: f64,
    #[serde(default = "default_len")]
    pub z_len: f64,
    #[serde(default = "default_res")]
    pub x_res: usize,
    #[serde(default = "default_res")]
    pub z_res: usize,
}

impl Dimensions {
    /// Grid vertices along x
    pub fn x_cells(&self) -> usize {
        (self.x_len * self.x_res as f64).floor() as usize + 1
    }

    /// Grid vertices along z
    pub fn z_cells(&self) -> usize {
        (self.z_len * self.z_res as f64).floor() as usize + 1
    }
}

impl Default for Dimensions {
    fn default() -> Self {
        Self {
            x_len: default_len(),
            y_len: default_len(),
            z_len: default_len(),
            x_res: default_res(),
            z_res: default_res(),
        }
    }
}

/// Data columns feeding each axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
pub struct Columns {
    #[serde(default, deserialize_with = "column_selector")]
    pub x1: Option<usize>,
    #[serde(default, deserialize_with = "column_selector")]
    pub x2: Option<usize>,
    #[serde(default, deserialize_with = "column_selector")]
    pub x3: Option<usize>,
}

impl Columns {
    pub fn new(x1: usize, x2: usize, x3: usize) -> Self {
        Self {
            x1: Some(x1),
            x2: Some(x2),
            x3: Some(x3),
        }
    }
}

/// Options consumed by the plotting pipeline
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlotOptions {
    #[serde(default)]
    pub mode: PlotMode,
    #[serde(default)]
    pub columns: Columns,
    #[serde(default, deserialize_with = "column_selector")]
    pub color_column: Option<usize>,
    #[serde(default = "default_color")]
    pub default_color: String,
    #[serde(default)]
    pub labeled: bool,
    #[serde(default)]
    pub header: bool,
    #[serde(default)]
    pub hue_offset: f64,
    #[serde(default = "default_true")]
    pub normalize: bool,
    #[serde(default = "default_true")]
    pub filter_color: bool,
    #[serde(default)]
    pub keep_old_plot: bool,
    #[serde(default)]
    pub dimensions: Dimensions,
    #[serde(default = "default_barchart_padding")]
    pub barchart_padding: f64,
    #[serde(default = "default_bar_size_threshold")]
    pub bar_size_threshold: f64,
    #[serde(default)]
    pub interpolation: Interpolation,
    #[serde(default = "default_som_epochs")]
    pub som_epochs: usize,
    #[serde(default = "default_som_radius")]
    pub som_radius: f64,
}

fn default_len() -> f64 {
    1.0
}

fn default_res() -> usize {
    20
}

fn default_color() -> String {
    "#0066ff".to_string()
}

fn default_true() -> bool {
    true
}

fn default_barchart_padding() -> f64 {
    0.1
}

fn default_bar_size_threshold() -> f64 {
    0.01
}

fn default_som_epochs() -> usize {
    80
}

fn default_som_radius() -> f64 {
    2.0
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            mode: PlotMode::default(),
            columns: Columns::default(),
            color_column: None,
            default_color: default_color(),
            labeled: false,
            header: false,
            hue_offset: 0.0,
            normalize: true,
            filter_color: true,
            keep_old_plot: false,
            dimensions: Dimensions::default(),
            barchart_padding: default_barchart_padding(),
            bar_size_threshold: default_bar_size_threshold(),
            interpolation: Interpolation::default(),
            som_epochs: default_som_epochs(),
            som_radius: default_som_radius(),
        }
    }
}

/// Column selectors accept an index, or `-1`, `false` or `null` for "unused"
fn column_selector<'de, D>(deserializer: D) -> std::result::Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Selector {
        Index(i64),
        Flag(bool),
    }

    match Option::<Selector>::deserialize(deserializer)? {
        Some(Selector::Index(i)) if i >= 0 => Ok(Some(i as usize)),
        Some(Selector::Index(_)) | Some(Selector::Flag(false)) | None => Ok(None),
        Some(Selector::Flag(true)) => Err(serde::de::Error::custom(
            "column selector must be an index, -1, false or null",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults() {
        let options: PlotOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options.mode, PlotMode::Scatterplot);
        assert!(options.normalize);
        assert_eq!(options.color_column, None);
        assert_eq!(options.dimensions.x_res, 20);
        assert_eq!(options.som_epochs, 80);
    }

    #[test]
    fn test_column_selector_sentinels() {
        let json = r#"{"color_column": -1, "columns": {"x1": 0, "x2": false, "x3": null}}"#;
        let options: PlotOptions = serde_json::from_str(json).unwrap();
        assert_eq!(options.color_column, None);
        assert_eq!(options.columns.x1, Some(0));
        assert_eq!(options.columns.x2, None);
        assert_eq!(options.columns.x3, None);

        let options: PlotOptions = serde_json::from_str(r#"{"color_column": 3}"#).unwrap();
        assert_eq!(options.color_column, Some(3));

        assert!(serde_json::from_str::<PlotOptions>(r#"{"color_column": true}"#).is_err());
    }

    #[test]
    fn test_mode_names() {
        let options: PlotOptions =
            serde_json::from_str(r#"{"mode": "barchart", "interpolation": "som"}"#).unwrap();
        assert_eq!(options.mode, PlotMode::Barchart);
        assert_eq!(options.interpolation, Interpolation::Som);
    }

    #[test]
    fn test_dimension_cells() {
        let dims = Dimensions {
            x_len: 1.0,
            y_len: 1.0,
            z_len: 2.0,
            x_res: 10,
            z_res: 5,
        };
        assert_eq!(dims.x_cells(), 11);
        assert_eq!(dims.z_cells(), 11);
    }
}
