//! Per-row colors for a dataframe.
//!
//! A color column is read one of four ways: as categorical labels, as
//! explicit color strings, as numbers mapped onto a heat scale, or (with
//! color filtering off) as literal `0xRRGGBB` values. When a non-labeled
//! column cannot be read, classification falls back first to assuming the
//! first row is a header, then to treating the column as labels.

use crate::color::{heat_color, is_color_notation, parse_color, Color, LIGHTNESS, SATURATION};
use crate::data::Dataframe;
use crate::error::{PlotError, Result};
use crate::scale::{min_max_from, Bounds};
use crate::PlotOptions;
use log::{debug, warn};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// One known label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelEntry {
    pub label: String,
    pub ordinal: usize,
    pub color: Color,
}

/// Labels in order of first sighting. Only ever grows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LabelMap {
    entries: Vec<LabelEntry>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl LabelMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<&LabelEntry> {
        self.index.get(label).map(|&i| &self.entries[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &LabelEntry> {
        self.entries.iter()
    }

    fn insert(&mut self, label: String, color: Color) {
        let ordinal = self.entries.len();
        self.index.insert(label.clone(), ordinal);
        self.entries.push(LabelEntry { label, ordinal, color });
    }
}

/// What the color column turned out to hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Absent,
    Labeled,
    Explicit,
    Heatmap,
    Literal,
}

/// Inputs of a color classification
#[derive(Debug, Clone, PartialEq)]
pub struct ColorRequest {
    pub column: Option<usize>,
    pub default_color: String,
    pub labeled: bool,
    pub has_header: bool,
    pub hue_offset: f64,
    pub filter_color: bool,
    pub keep_old: bool,
}

impl ColorRequest {
    /// Request for an already header-stripped dataframe
    pub fn from_options(options: &PlotOptions) -> Self {
        Self {
            column: options.color_column,
            default_color: options.default_color.clone(),
            labeled: options.labeled,
            has_header: false,
            hue_offset: options.hue_offset,
            filter_color: options.filter_color,
            keep_old: options.keep_old_plot,
        }
    }
}

/// Result of a classification
#[derive(Debug, Clone, PartialEq)]
pub struct ColorMap {
    /// Exactly one color per input row
    pub colors: Vec<Color>,
    pub labels: LabelMap,
    pub label_count: usize,
    pub kind: ColumnKind,
    /// Bounds of a heat-mapped column
    pub bounds: Option<Bounds>,
    /// Row 0 was treated as a header line and only got the default color
    pub header_detected: bool,
}

/// Why an attempt could not classify the column
#[derive(Debug, Clone, PartialEq)]
pub enum RetryReason {
    UnreadableSample { row: usize, value: String },
    NoSample,
}

/// Outcome of a single classification attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Classified(ColorMap),
    NeedsRetry(RetryReason),
}

/// Attempts in the order they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    AsRequested,
    AssumeHeader,
    AssumeLabeled,
}

impl Stage {
    fn next(self, request: &ColorRequest) -> Option<Stage> {
        match self {
            Stage::AsRequested if !request.has_header => Some(Stage::AssumeHeader),
            Stage::AsRequested | Stage::AssumeHeader => Some(Stage::AssumeLabeled),
            Stage::AssumeLabeled => None,
        }
    }

    fn apply(self, request: &ColorRequest) -> ColorRequest {
        let mut attempt = request.clone();
        match self {
            Stage::AsRequested => {}
            Stage::AssumeHeader => attempt.has_header = true,
            Stage::AssumeLabeled => attempt.labeled = true,
        }
        attempt
    }
}

/// Assign a color to every row of `df`.
///
/// `labels` is the label map carried over from earlier calls (empty for a
/// fresh session); known labels keep their color. `previous_bounds` widens
/// the heat scale when `keep_old` is requested.
pub fn get_color_map(
    df: &Dataframe,
    request: &ColorRequest,
    labels: &LabelMap,
    previous_bounds: Option<Bounds>,
) -> Result<ColorMap> {
    let mut stage = Some(Stage::AsRequested);
    let mut last_reason = None;

    while let Some(current) = stage {
        let attempt = current.apply(request);
        match classify(df, &attempt, labels, previous_bounds)? {
            Step::Classified(map) => return Ok(map),
            Step::NeedsRetry(reason) => {
                stage = current.next(request);
                match stage {
                    Some(Stage::AssumeHeader) => warn!(
                        "color column could not be read ({:?}); retrying with the first row as header",
                        reason
                    ),
                    Some(Stage::AssumeLabeled) => warn!(
                        "color column could not be read ({:?}); treating it as labels",
                        reason
                    ),
                    _ => {}
                }
                last_reason = Some(reason);
            }
        }
    }

    Err(PlotError::ColorClassification {
        column: request.column.unwrap_or_default(),
        reason: format!("{:?}", last_reason),
    })
}

/// One classification attempt with fixed flags
pub fn classify(
    df: &Dataframe,
    request: &ColorRequest,
    labels: &LabelMap,
    previous_bounds: Option<Bounds>,
) -> Result<Step> {
    let default_color = parse_color(&request.default_color)
        .ok_or_else(|| PlotError::InvalidColor(request.default_color.clone()))?;

    let Some(column) = request.column else {
        return Ok(Step::Classified(uniform(df, default_color, labels)));
    };
    if !df.is_empty() {
        df.check_column(column)?;
    }

    let first_row = usize::from(request.has_header);
    if request.labeled {
        let map = map_labels(df, column, first_row, request, labels, default_color);
        return Ok(Step::Classified(map));
    }

    let Some(sample) = df.cell(first_row, column) else {
        return Ok(Step::NeedsRetry(RetryReason::NoSample));
    };

    let map = if sample.as_f64().is_some() {
        if request.filter_color {
            map_heat(df, column, first_row, request, labels, previous_bounds, default_color)?
        } else {
            map_literal(df, column, first_row, request, labels, default_color)
        }
    } else if sample.as_text().map(is_color_notation).unwrap_or(false) {
        map_explicit(df, column, first_row, request, labels, default_color)
    } else {
        return Ok(Step::NeedsRetry(RetryReason::UnreadableSample {
            row: first_row,
            value: sample.to_string(),
        }));
    };
    Ok(Step::Classified(map))
}

fn uniform(df: &Dataframe, color: Color, labels: &LabelMap) -> ColorMap {
    ColorMap {
        colors: vec![color; df.len()],
        labels: labels.clone(),
        label_count: labels.len(),
        kind: ColumnKind::Absent,
        bounds: None,
        header_detected: false,
    }
}

fn map_labels(
    df: &Dataframe,
    column: usize,
    first_row: usize,
    request: &ColorRequest,
    known: &LabelMap,
    default_color: Color,
) -> ColorMap {
    let mut labels = known.clone();

    // first pass: discover new labels, so the hue spread knows the total
    let mut discovered: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for row in df.rows.iter().skip(first_row) {
        let label = row[column].to_string();
        if labels.get(&label).is_none() && seen.insert(label.clone()) {
            discovered.push(label);
        }
    }

    let total = (labels.len() + discovered.len()).max(1) as f64;
    for label in discovered {
        let hue = labels.len() as f64 / total + request.hue_offset;
        labels.insert(label, Color::from_hsl(hue, SATURATION, LIGHTNESS));
    }

    let colors = df
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            if i < first_row {
                return default_color;
            }
            labels
                .get(&row[column].to_string())
                .map(|entry| entry.color)
                .unwrap_or(default_color)
        })
        .collect();

    debug!("{} labels in color column {}", labels.len(), column);
    ColorMap {
        colors,
        label_count: labels.len(),
        labels,
        kind: ColumnKind::Labeled,
        bounds: None,
        header_detected: request.has_header,
    }
}

fn map_explicit(
    df: &Dataframe,
    column: usize,
    first_row: usize,
    request: &ColorRequest,
    labels: &LabelMap,
    default_color: Color,
) -> ColorMap {
    let colors = df
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            if i < first_row {
                return default_color;
            }
            let cell = &row[column];
            parse_color(&cell.to_string()).unwrap_or_else(|| {
                warn!("row {}: '{}' is not a color, using the default", i, cell);
                default_color
            })
        })
        .collect();

    ColorMap {
        colors,
        labels: labels.clone(),
        label_count: labels.len(),
        kind: ColumnKind::Explicit,
        bounds: None,
        header_detected: request.has_header,
    }
}

fn map_heat(
    df: &Dataframe,
    column: usize,
    first_row: usize,
    request: &ColorRequest,
    labels: &LabelMap,
    previous_bounds: Option<Bounds>,
    default_color: Color,
) -> Result<ColorMap> {
    let bounds = min_max_from(df, column, first_row, previous_bounds, request.keep_old)?;

    let colors = df
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| match row[column].as_f64() {
            Some(v) if i >= first_row && v.is_finite() => {
                heat_color(bounds.normalize(v), request.hue_offset)
            }
            _ => default_color,
        })
        .collect();

    Ok(ColorMap {
        colors,
        labels: labels.clone(),
        label_count: labels.len(),
        kind: ColumnKind::Heatmap,
        bounds: Some(bounds),
        header_detected: request.has_header,
    })
}

fn map_literal(
    df: &Dataframe,
    column: usize,
    first_row: usize,
    request: &ColorRequest,
    labels: &LabelMap,
    default_color: Color,
) -> ColorMap {
    let colors = df
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| match row[column].as_f64() {
            Some(v) if i >= first_row && (0.0..=16_777_215.0).contains(&v) => {
                Color::from_hex_value(v as u32)
            }
            _ => default_color,
        })
        .collect();

    ColorMap {
        colors,
        labels: labels.clone(),
        label_count: labels.len(),
        kind: ColumnKind::Literal,
        bounds: None,
        header_detected: request.has_header,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Cell;

    fn frame(rows: Vec<Vec<Cell>>) -> Dataframe {
        Dataframe::from_rows(rows, false).unwrap()
    }

    fn request(column: Option<usize>, labeled: bool) -> ColorRequest {
        ColorRequest {
            column,
            default_color: "#0066ff".to_string(),
            labeled,
            has_header: false,
            hue_offset: 0.0,
            filter_color: true,
            keep_old: false,
        }
    }

    fn label_frame() -> Dataframe {
        frame(vec![
            vec![Cell::from(1), Cell::from("setosa")],
            vec![Cell::from(2), Cell::from("virginica")],
            vec![Cell::from(3), Cell::from("setosa")],
            vec![Cell::from(4), Cell::from("versicolor")],
        ])
    }

    #[test]
    fn test_absent_column_uses_default() {
        let df = label_frame();
        let map = get_color_map(&df, &request(None, false), &LabelMap::new(), None).unwrap();
        assert_eq!(map.colors.len(), df.len());
        assert!(map.colors.iter().all(|c| *c == Color::from_rgb8(0, 0x66, 0xff)));
        assert_eq!(map.kind, ColumnKind::Absent);
    }

    #[test]
    fn test_labels_in_order_of_sighting() {
        let df = label_frame();
        let map = get_color_map(&df, &request(Some(1), true), &LabelMap::new(), None).unwrap();
        assert_eq!(map.label_count, 3);
        let names: Vec<&str> = map.labels.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(names, vec!["setosa", "virginica", "versicolor"]);
        assert_eq!(map.colors[0], map.colors[2]);
        assert_ne!(map.colors[0], map.colors[1]);
        // hue = ordinal / count
        let (hue, _, _) = map.labels.get("virginica").unwrap().color.to_hsl();
        assert!((hue - 1.0 / 3.0).abs() < 0.01);
    }

    #[test]
    fn test_label_map_reuse_is_idempotent() {
        let df = label_frame();
        let req = request(Some(1), true);
        let first = get_color_map(&df, &req, &LabelMap::new(), None).unwrap();
        let second = get_color_map(&df, &req, &first.labels, None).unwrap();
        assert_eq!(first.colors, second.colors);
        assert_eq!(first.labels, second.labels);
    }

    #[test]
    fn test_carried_labels_keep_their_color() {
        let req = request(Some(0), true);
        let first = get_color_map(
            &frame(vec![vec![Cell::from("a")], vec![Cell::from("b")]]),
            &req,
            &LabelMap::new(),
            None,
        )
        .unwrap();
        let second = get_color_map(
            &frame(vec![vec![Cell::from("c")], vec![Cell::from("a")]]),
            &req,
            &first.labels,
            None,
        )
        .unwrap();
        assert_eq!(second.colors[1], first.labels.get("a").unwrap().color);
        assert_eq!(second.label_count, 3);
        assert_eq!(second.labels.get("c").unwrap().ordinal, 2);
    }

    #[test]
    fn test_explicit_colors() {
        let df = frame(vec![
            vec![Cell::from("#ff0000")],
            vec![Cell::from("rgb(0, 255, 0)")],
            vec![Cell::from("hsl(240, 100%, 50%)")],
        ]);
        let map = get_color_map(&df, &request(Some(0), false), &LabelMap::new(), None).unwrap();
        assert_eq!(map.kind, ColumnKind::Explicit);
        assert_eq!(map.colors[0].to_rgb8(), (255, 0, 0));
        assert_eq!(map.colors[1].to_rgb8(), (0, 255, 0));
        assert_eq!(map.colors[2].to_rgb8(), (0, 0, 255));
    }

    #[test]
    fn test_heatmap_hot_and_cold() {
        let df = frame(vec![vec![Cell::from(0)], vec![Cell::from(5)], vec![Cell::from(10)]]);
        let map = get_color_map(&df, &request(Some(0), false), &LabelMap::new(), None).unwrap();
        assert_eq!(map.kind, ColumnKind::Heatmap);
        assert_eq!(map.bounds, Some(Bounds::new(0.0, 10.0)));
        assert_eq!(map.colors[2], heat_color(1.0, 0.0));
        assert_eq!(map.colors[0], heat_color(0.0, 0.0));
    }

    #[test]
    fn test_heatmap_respects_previous_bounds() {
        let df = frame(vec![vec![Cell::from(5)], vec![Cell::from(10)]]);
        let mut req = request(Some(0), false);
        req.keep_old = true;
        let map = get_color_map(&df, &req, &LabelMap::new(), Some(Bounds::new(0.0, 20.0))).unwrap();
        assert_eq!(map.bounds, Some(Bounds::new(0.0, 20.0)));
        assert_eq!(map.colors[1], heat_color(0.5, 0.0));
    }

    #[test]
    fn test_literal_colors_without_filter() {
        let df = frame(vec![vec![Cell::from(16_711_680.0)], vec![Cell::from(255.0)]]);
        let mut req = request(Some(0), false);
        req.filter_color = false;
        let map = get_color_map(&df, &req, &LabelMap::new(), None).unwrap();
        assert_eq!(map.kind, ColumnKind::Literal);
        assert_eq!(map.colors[0].to_rgb8(), (255, 0, 0));
        assert_eq!(map.colors[1].to_rgb8(), (0, 0, 255));
    }

    #[test]
    fn test_fallback_to_header() {
        let df = frame(vec![
            vec![Cell::from("temperature")],
            vec![Cell::from(1)],
            vec![Cell::from(3)],
        ]);
        let map = get_color_map(&df, &request(Some(0), false), &LabelMap::new(), None).unwrap();
        assert_eq!(map.kind, ColumnKind::Heatmap);
        assert!(map.header_detected);
        assert_eq!(map.colors.len(), 3);
        assert_eq!(map.bounds, Some(Bounds::new(1.0, 3.0)));
    }

    #[test]
    fn test_fallback_to_labels() {
        let df = label_frame();
        let map = get_color_map(&df, &request(Some(1), false), &LabelMap::new(), None).unwrap();
        assert_eq!(map.kind, ColumnKind::Labeled);
        assert!(!map.header_detected);
        assert_eq!(map.label_count, 3);
        assert_eq!(map.colors.len(), 4);
    }

    #[test]
    fn test_classify_reports_retry() {
        let df = label_frame();
        let step = classify(&df, &request(Some(1), false), &LabelMap::new(), None).unwrap();
        assert!(matches!(step, Step::NeedsRetry(RetryReason::UnreadableSample { row: 0, .. })));
    }

    #[test]
    fn test_column_out_of_bounds() {
        let df = label_frame();
        assert!(get_color_map(&df, &request(Some(9), true), &LabelMap::new(), None).is_err());
    }

    #[test]
    fn test_invalid_default_color() {
        let df = label_frame();
        let mut req = request(None, false);
        req.default_color = "not-a-color".to_string();
        assert!(matches!(
            get_color_map(&df, &req, &LabelMap::new(), None),
            Err(PlotError::InvalidColor(_))
        ));
    }
}
