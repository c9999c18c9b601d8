use thiserror::Error;

/// Errors raised by the data-to-geometry pipeline.
#[derive(Debug, Error)]
pub enum PlotError {
    #[error("dataframe has no data rows")]
    EmptyDataframe,

    #[error("row {row} has {found} columns, expected {expected}")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("column {column} is out of bounds for rows with {width} columns")]
    ColumnOutOfBounds { column: usize, width: usize },

    #[error("{axis} column is required for this plot mode")]
    MissingColumn { axis: &'static str },

    #[error(
        "column {column} starts with non-numeric value '{value}'; \
         check the column index or the csv separator"
    )]
    NonNumericSeed { column: usize, value: String },

    #[error("could not classify color column {column}: {reason}")]
    ColorClassification { column: usize, reason: String },

    #[error("invalid color '{0}'")]
    InvalidColor(String),

    #[error("failed to read csv input")]
    Csv(#[from] csv::Error),

    #[error("invalid json input: {0}")]
    Json(String),
}

pub type Result<T> = std::result::Result<T, PlotError>;
