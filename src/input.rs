//! Tabular inputs: weighted interaction records and per-node attributes.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::debug;

use crate::error::{Error, Result};

pub const SOURCE_COLUMN: &str = "source";
pub const TARGET_COLUMN: &str = "target";
pub const WEIGHT_COLUMN: &str = "weight";
pub const NAME_COLUMN: &str = "name";
pub const CATEGORY_COLUMNS: [&str; 2] = ["faction", "category"];

/// Weight used for every record when the input has no weight column at all.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// One raw interaction row.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
    pub weight: f64,
}

impl EdgeRecord {
    pub fn new(source: impl Into<String>, target: impl Into<String>, weight: f64) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            weight,
        }
    }
}

/// External category per node identity, e.g. a faction.
#[derive(Debug, Clone, Default)]
pub struct AttributeTable {
    categories: HashMap<String, String>,
}

impl AttributeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later rows for the same name replace earlier ones.
    pub fn insert(&mut self, name: impl Into<String>, category: impl Into<String>) {
        self.categories.insert(name.into(), category.into());
    }

    pub fn category(&self, name: &str) -> Option<&str> {
        self.categories.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl<N: Into<String>, C: Into<String>> FromIterator<(N, C)> for AttributeTable {
    fn from_iter<I: IntoIterator<Item = (N, C)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (name, category) in iter {
            table.insert(name, category);
        }
        table
    }
}

fn column_index(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

fn node_key(record: &StringRecord, idx: usize, column: &str) -> Result<String> {
    let value = record.get(idx).unwrap_or("");
    if value.is_empty() {
        return Err(Error::InvalidNodeKey {
            line: line_of(record),
            column: column.to_string(),
        });
    }
    Ok(value.to_string())
}

fn parse_weight(record: &StringRecord, idx: usize) -> Result<f64> {
    let raw = record.get(idx).unwrap_or("");
    match raw.parse::<f64>() {
        Ok(weight) if weight.is_finite() => Ok(weight),
        _ => Err(Error::InvalidWeight {
            line: line_of(record),
            value: raw.to_string(),
        }),
    }
}

/// Reads interaction records in input order.
///
/// The `source` and `target` columns are required. Without a `weight` column every
/// record weighs [`DEFAULT_WEIGHT`]; with one, each cell must be a finite number.
pub fn read_edges<R: Read>(reader: R) -> Result<Vec<EdgeRecord>> {
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let source_idx = column_index(&headers, SOURCE_COLUMN);
    let target_idx = column_index(&headers, TARGET_COLUMN);
    let (source_idx, target_idx) = match (source_idx, target_idx) {
        (Some(s), Some(t)) => (s, t),
        _ => {
            let missing = [(SOURCE_COLUMN, source_idx), (TARGET_COLUMN, target_idx)]
                .iter()
                .filter(|(_, idx)| idx.is_none())
                .map(|(name, _)| name.to_string())
                .collect();
            return Err(Error::MissingColumns {
                input: "interaction input".to_string(),
                missing,
            });
        }
    };
    let weight_idx = column_index(&headers, WEIGHT_COLUMN);
    if weight_idx.is_none() {
        debug!("no weight column, every record weighs {}", DEFAULT_WEIGHT);
    }

    let mut records = Vec::new();
    for row in rdr.records() {
        let row = row?;
        let weight = match weight_idx {
            Some(idx) => parse_weight(&row, idx)?,
            None => DEFAULT_WEIGHT,
        };
        records.push(EdgeRecord {
            source: node_key(&row, source_idx, SOURCE_COLUMN)?,
            target: node_key(&row, target_idx, TARGET_COLUMN)?,
            weight,
        });
    }
    Ok(records)
}

pub fn read_edges_from_path(path: &Path) -> Result<Vec<EdgeRecord>> {
    read_edges(File::open(path)?)
}

/// Reads the attribute table. `name` is required; the category comes from a
/// `faction` (or `category`) column and is empty when that column is absent.
pub fn read_attributes<R: Read>(reader: R) -> Result<AttributeTable> {
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let name_idx = column_index(&headers, NAME_COLUMN).ok_or_else(|| Error::MissingColumns {
        input: "attribute input".to_string(),
        missing: vec![NAME_COLUMN.to_string()],
    })?;
    let category_idx = CATEGORY_COLUMNS
        .iter()
        .find_map(|column| column_index(&headers, column));

    let mut table = AttributeTable::new();
    for row in rdr.records() {
        let row = row?;
        let name = node_key(&row, name_idx, NAME_COLUMN)?;
        let category = category_idx
            .and_then(|idx| row.get(idx))
            .unwrap_or("")
            .to_string();
        table.insert(name, category);
    }
    Ok(table)
}

pub fn read_attributes_from_path(path: &Path) -> Result<AttributeTable> {
    read_attributes(File::open(path)?)
}
