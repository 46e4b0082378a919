//! In-memory column source

use std::collections::HashMap;

use bytes::Bytes;

use super::{check_selection, ColumnSource, RawRecord};
use crate::error::{ColProtoError, Result};

/// Column source over rows held in memory
///
/// Every row must have exactly `column_count` entries. Columns outside the
/// selection are presented as empty, as a column reader that skipped them
/// would.
#[derive(Debug, Clone)]
pub struct MemoryColumnSource {
    column_count: usize,
    rows: Vec<Vec<Bytes>>,
    metadata: HashMap<String, Bytes>,
    selected: Option<Vec<usize>>,
    position: Option<usize>,
    started: bool,
}

impl MemoryColumnSource {
    /// Creates a source with `column_count` physical columns
    pub fn new(column_count: usize) -> Self {
        Self {
            column_count,
            rows: Vec::new(),
            metadata: HashMap::new(),
            selected: None,
            position: None,
            started: false,
        }
    }

    /// Adds a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Appends a row; it must have one entry per physical column
    pub fn push_row(&mut self, row: Vec<Bytes>) -> Result<()> {
        if row.len() != self.column_count {
            return Err(ColProtoError::InvalidState(format!(
                "row has {} columns, source has {}",
                row.len(),
                self.column_count
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Builder-style [`push_row`](Self::push_row)
    pub fn with_row(mut self, row: Vec<Bytes>) -> Result<Self> {
        self.push_row(row)?;
        Ok(self)
    }

    /// Physical columns being read; `None` means all
    pub fn selected_columns(&self) -> Option<&[usize]> {
        self.selected.as_deref()
    }

    /// Number of rows held
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }
}

impl ColumnSource for MemoryColumnSource {
    fn column_count(&self) -> usize {
        self.column_count
    }

    fn metadata(&self, key: &str) -> Option<&[u8]> {
        self.metadata.get(key).map(|value| value.as_ref())
    }

    fn select_columns(&mut self, columns: &[usize]) -> Result<()> {
        if self.started {
            return Err(ColProtoError::InvalidState(
                "columns must be selected before iteration begins".into(),
            ));
        }
        check_selection(columns, self.column_count)?;
        self.selected = Some(columns.to_vec());
        Ok(())
    }

    fn advance(&mut self) -> Result<bool> {
        self.started = true;
        let next = self.position.map_or(0, |p| p + 1);
        if next < self.rows.len() {
            self.position = Some(next);
            Ok(true)
        } else {
            self.position = Some(self.rows.len());
            Ok(false)
        }
    }

    fn current(&self) -> Result<Option<RawRecord<'_>>> {
        let Some(row) = self.position.and_then(|p| self.rows.get(p)) else {
            return Ok(None);
        };

        let record = match &self.selected {
            None => RawRecord::new(row.iter().map(|b| b.as_ref()).collect()),
            Some(columns) => {
                let mut record = RawRecord::with_width(self.column_count);
                for &column in columns {
                    record.set(column, row[column].as_ref());
                }
                record
            }
        };
        Ok(Some(record))
    }
}
