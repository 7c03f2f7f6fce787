//! A minimal column-named table.
//!
//! Frames are the tabular input shape accepted by the converters and the
//! data handed to runtime-defined measures. Cells are optional so that a
//! frame can carry sparse columns such as a qrels `iteration`.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::error::FormatError;
use crate::value::Value;

/// A table of rows with named columns.
///
/// # Examples
///
/// ```
/// use ir_eval::{Frame, Value};
///
/// let frame = Frame::new(["query_id", "doc_id", "score"])
///     .with_row([Some("q1".into()), Some("d1".into()), Some(Value::Float(0.3))])
///     .with_row([Some("q1".into()), Some("d2".into()), Some(Value::Float(0.9))])
///     .with_row([Some("q2".into()), Some("d1".into()), Some(Value::Float(0.5))]);
///
/// let top = frame.sorted_by(&[("query_id", false), ("score", true)]).head_per_group("query_id", 1);
/// let docs: Vec<_> = top.column("doc_id").unwrap().flatten().map(Value::to_plain_string).collect();
/// assert_eq!(docs, vec!["d2", "d1"]);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Option<Value>>>,
}

impl Frame {
    /// Creates an empty frame with the given columns.
    #[must_use]
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a row and returns the frame.
    ///
    /// Missing trailing cells are empty; cells beyond the last column are dropped.
    #[must_use]
    pub fn with_row<I>(mut self, row: I) -> Self
    where
        I: IntoIterator<Item = Option<Value>>,
    {
        self.push_row(row);
        self
    }

    /// Appends a row.
    pub fn push_row<I>(&mut self, row: I)
    where
        I: IntoIterator<Item = Option<Value>>,
    {
        let mut row: Vec<Option<Value>> = row.into_iter().take(self.columns.len()).collect();
        row.resize(self.columns.len(), None);
        self.rows.push(row);
    }

    /// Returns the column names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the frame has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the position of a column.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Returns true if the frame has a column.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Iterates over one column's cells.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = Option<&Value>>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| row[idx].as_ref()))
    }

    /// Iterates over rows.
    pub fn rows(&self) -> impl Iterator<Item = &[Option<Value>]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Returns one row.
    #[must_use]
    pub fn row(&self, idx: usize) -> Option<&[Option<Value>]> {
        self.rows.get(idx).map(Vec::as_slice)
    }

    /// Returns one cell.
    #[must_use]
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)?.as_ref()
    }

    /// Fails unless every required column is present.
    ///
    /// # Errors
    ///
    /// Returns `FormatError::MissingColumns` listing the absent columns and
    /// the columns the frame does have.
    pub fn require_columns<S: AsRef<str>>(
        &self,
        kind: &'static str,
        required: &[S],
    ) -> Result<(), FormatError> {
        let missing: Vec<String> = required
            .iter()
            .map(AsRef::as_ref)
            .filter(|c| !self.has_column(c))
            .map(str::to_string)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(FormatError::MissingColumns {
                kind,
                missing,
                found: self.columns.clone(),
            })
        }
    }

    /// Returns a copy with only the named columns, in the given order.
    ///
    /// Unknown names are skipped.
    #[must_use]
    pub fn select<S: AsRef<str>>(&self, columns: &[S]) -> Self {
        let picked: Vec<(String, usize)> = columns
            .iter()
            .filter_map(|c| {
                let c = c.as_ref();
                self.column_index(c).map(|idx| (c.to_string(), idx))
            })
            .collect();
        Self {
            columns: picked.iter().map(|(c, _)| c.clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| picked.iter().map(|(_, idx)| row[*idx].clone()).collect())
                .collect(),
        }
    }

    /// Returns a stably sorted copy. Each key is `(column, descending)`.
    ///
    /// Empty cells sort first; unknown columns are ignored.
    #[must_use]
    pub fn sorted_by(&self, keys: &[(&str, bool)]) -> Self {
        let keys: Vec<(usize, bool)> = keys
            .iter()
            .filter_map(|(c, desc)| self.column_index(c).map(|idx| (idx, *desc)))
            .collect();
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| {
            for (idx, desc) in &keys {
                let ord = compare_cells(a[*idx].as_ref(), b[*idx].as_ref());
                let ord = if *desc { ord.reverse() } else { ord };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
        Self {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Keeps the first `n` rows for each distinct `group` value, in current order.
    #[must_use]
    pub fn head_per_group(&self, group: &str, n: usize) -> Self {
        let Some(idx) = self.column_index(group) else {
            return self.clone();
        };
        let mut seen: BTreeMap<String, usize> = BTreeMap::new();
        let rows = self
            .rows
            .iter()
            .filter(|row| {
                let key = cell_key(row[idx].as_ref());
                let count = seen.entry(key).or_insert(0);
                *count += 1;
                *count <= n
            })
            .cloned()
            .collect();
        Self {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Splits the frame by the plain-text value of a column.
    ///
    /// Groups are ordered by key; rows keep their relative order.
    #[must_use]
    pub fn group_by(&self, column: &str) -> BTreeMap<String, Self> {
        let mut groups: BTreeMap<String, Self> = BTreeMap::new();
        let Some(idx) = self.column_index(column) else {
            return groups;
        };
        for row in &self.rows {
            groups
                .entry(cell_key(row[idx].as_ref()))
                .or_insert_with(|| Self::new(self.columns.iter().cloned()))
                .rows
                .push(row.clone());
        }
        groups
    }

    /// Returns the rows whose cell in `column` equals `value`.
    #[must_use]
    pub fn filter_eq(&self, column: &str, value: &Value) -> Self {
        let rows = match self.column_index(column) {
            Some(idx) => self
                .rows
                .iter()
                .filter(|row| row[idx].as_ref() == Some(value))
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        Self {
            columns: self.columns.clone(),
            rows,
        }
    }
}

fn cell_key(cell: Option<&Value>) -> String {
    cell.map(Value::to_plain_string).unwrap_or_default()
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Bool(_) => 0,
        Value::Int(_) | Value::Float(_) => 1,
        Value::Str(_) => 2,
        Value::Map(_) => 3,
    }
}

fn compare_cells(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Int(x), Value::Int(y)) => x.cmp(y),
            (Value::Str(x), Value::Str(y)) => x.cmp(y),
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            (Value::Map(x), Value::Map(y)) => x.cmp(y),
            _ => match (a.as_float(), b.as_float()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => type_rank(a).cmp(&type_rank(b)),
            },
        },
    }
}
