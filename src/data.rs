use crate::error::{PlotError, Result};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::io::Read;

/// A single dataframe cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
}

impl Cell {
    /// Build a cell from raw text, keeping it numeric when it parses as a
    /// finite number. `nan` and `inf` stay text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match parse_finite(trimmed) {
            Some(n) => Cell::Number(n),
            None => Cell::Text(trimmed.to_string()),
        }
    }

    /// Finite numeric value of the cell, if any. Text holding a number
    /// counts; NaN and infinities do not.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n).filter(|n| n.is_finite()),
            Cell::Text(s) => parse_finite(s.trim()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            Cell::Number(_) => None,
        }
    }
}

fn parse_finite(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<i32> for Cell {
    fn from(n: i32) -> Self {
        Cell::Number(n as f64)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

/// Tabular input: ordered rows of ordered cells, header already removed.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataframe {
    pub headers: Option<Vec<String>>,
    pub rows: Vec<Vec<Cell>>,
}

impl Dataframe {
    /// Create a dataframe from rows, splitting off the first row as header
    /// when `has_header` is set. All remaining rows must have equal width.
    pub fn from_rows(mut rows: Vec<Vec<Cell>>, has_header: bool) -> Result<Self> {
        let headers = if has_header && !rows.is_empty() {
            let header = rows.remove(0);
            Some(header.iter().map(|c| c.to_string()).collect())
        } else {
            None
        };

        let df = Self { headers, rows };
        df.validate()?;
        Ok(df)
    }

    /// Read delimiter-separated text. Quoting follows the csv crate.
    pub fn from_csv_reader<R: Read>(reader: R, delimiter: u8, has_header: bool) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .delimiter(delimiter)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            if record.iter().all(|f| f.is_empty()) {
                continue;
            }
            rows.push(record.iter().map(Cell::parse).collect());
        }

        Self::from_rows(rows, has_header)
    }

    /// Create a dataframe from a JSON array of arrays or array of objects.
    /// Objects take their header from the keys of the first item.
    pub fn from_json(value: &Value) -> Result<Self> {
        let array = value
            .as_array()
            .ok_or_else(|| PlotError::Json("input data must be a JSON array".to_string()))?;

        let first = array
            .first()
            .ok_or(PlotError::EmptyDataframe)?;

        if let Some(first_obj) = first.as_object() {
            let headers: Vec<String> = first_obj.keys().cloned().collect();
            let mut rows = Vec::with_capacity(array.len());
            for item in array {
                let obj = item.as_object().ok_or_else(|| {
                    PlotError::Json("items in array must all be objects".to_string())
                })?;
                let mut row = Vec::with_capacity(headers.len());
                for header in &headers {
                    row.push(json_cell(obj.get(header), header)?);
                }
                rows.push(row);
            }
            let df = Self {
                headers: Some(headers),
                rows,
            };
            df.validate()?;
            return Ok(df);
        }

        let mut rows = Vec::with_capacity(array.len());
        for item in array {
            let items = item.as_array().ok_or_else(|| {
                PlotError::Json("items in array must all be arrays".to_string())
            })?;
            let row = items
                .iter()
                .map(|v| json_cell(Some(v), "array item"))
                .collect::<Result<Vec<_>>>()?;
            rows.push(row);
        }
        Self::from_rows(rows, false)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column count shared by every row (0 for an empty frame)
    pub fn width(&self) -> usize {
        self.rows.first().map(|r| r.len()).unwrap_or(0)
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// Fail when a column selector points past the row width
    pub fn check_column(&self, column: usize) -> Result<()> {
        let width = self.width();
        if column >= width {
            return Err(PlotError::ColumnOutOfBounds { column, width });
        }
        Ok(())
    }

    /// Drop the first row, e.g. once it turned out to be a header line.
    pub fn strip_first_row(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        let header = self.rows.remove(0);
        self.headers = Some(header.iter().map(|c| c.to_string()).collect());
    }

    fn validate(&self) -> Result<()> {
        let expected = self.width();
        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != expected {
                return Err(PlotError::RaggedRow {
                    row: i,
                    found: row.len(),
                    expected,
                });
            }
        }
        Ok(())
    }
}

fn json_cell(value: Option<&Value>, field: &str) -> Result<Cell> {
    match value {
        Some(Value::Number(n)) => Ok(Cell::Number(n.as_f64().unwrap_or(f64::NAN))),
        Some(Value::String(s)) => Ok(Cell::Text(s.clone())),
        Some(Value::Bool(b)) => Ok(Cell::Text(b.to_string())),
        Some(Value::Null) | None => Ok(Cell::Text(String::new())),
        _ => Err(PlotError::Json(format!(
            "unsupported value type for field '{}'",
            field
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cell_parse() {
        assert_eq!(Cell::parse(" 1.5 "), Cell::Number(1.5));
        assert_eq!(Cell::parse("red"), Cell::Text("red".to_string()));
        assert_eq!(Cell::Text("2".to_string()).as_f64(), Some(2.0));
        assert_eq!(Cell::Text("#ff0000".to_string()).as_f64(), None);
    }

    #[test]
    fn test_non_finite_cells_are_not_numbers() {
        assert_eq!(Cell::parse("nan"), Cell::Text("nan".to_string()));
        assert_eq!(Cell::parse("-inf"), Cell::Text("-inf".to_string()));
        assert_eq!(Cell::parse("infinity").as_f64(), None);
        assert_eq!(Cell::from(f64::NAN).as_f64(), None);
        assert_eq!(Cell::from(f64::INFINITY).as_f64(), None);
        assert_eq!(Cell::parse("1e3").as_f64(), Some(1000.0));
    }

    #[test]
    fn test_from_rows_strips_header() {
        let rows = vec![
            vec![Cell::from("a"), Cell::from("b")],
            vec![Cell::from(1), Cell::from(2)],
        ];
        let df = Dataframe::from_rows(rows, true).unwrap();
        assert_eq!(df.headers, Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(df.len(), 1);
        assert_eq!(df.width(), 2);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let rows = vec![vec![Cell::from(1), Cell::from(2)], vec![Cell::from(1)]];
        let err = Dataframe::from_rows(rows, false).unwrap_err();
        assert!(matches!(err, PlotError::RaggedRow { row: 1, found: 1, expected: 2 }));
    }

    #[test]
    fn test_from_csv_reader() {
        let text = "x;y;label\n1;2;a\n3;4;b\n";
        let df = Dataframe::from_csv_reader(text.as_bytes(), b';', true).unwrap();
        assert_eq!(df.len(), 2);
        assert_eq!(df.cell(1, 0), Some(&Cell::Number(3.0)));
        assert_eq!(df.cell(1, 2), Some(&Cell::Text("b".to_string())));
    }

    #[test]
    fn test_from_json_objects() {
        let value = json!([
            {"x": 1, "y": "a"},
            {"x": 2, "y": "b"}
        ]);
        let df = Dataframe::from_json(&value).unwrap();
        assert_eq!(df.len(), 2);
        assert!(df.headers.is_some());
    }

    #[test]
    fn test_from_json_arrays() {
        let value = json!([[0, 0, 0], [1, 1, 1]]);
        let df = Dataframe::from_json(&value).unwrap();
        assert_eq!(df.width(), 3);
        assert_eq!(df.cell(1, 1), Some(&Cell::Number(1.0)));
    }

    #[test]
    fn test_from_json_empty() {
        assert!(Dataframe::from_json(&json!([])).is_err());
    }

    #[test]
    fn test_check_column() {
        let df = Dataframe::from_rows(vec![vec![Cell::from(1)]], false).unwrap();
        assert!(df.check_column(0).is_ok());
        assert!(matches!(
            df.check_column(3),
            Err(PlotError::ColumnOutOfBounds { column: 3, width: 1 })
        ));
    }
}
