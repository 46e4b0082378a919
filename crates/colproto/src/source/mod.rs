//! Column readers
//!
//! A [`ColumnSource`] is the storage side of a read: it knows how many
//! physical columns a file has, exposes the file's key/value metadata, reads
//! only the columns it was told to, and hands out one [`RawRecord`] at a time.
//!
//! Two implementations are provided:
//! - [`ParquetColumnSource`]: Parquet files with one `Binary` column per
//!   physical column
//! - [`MemoryColumnSource`]: rows held in memory

pub mod memory;
pub mod parquet_file;
pub mod validation;

pub use memory::MemoryColumnSource;
pub use parquet_file::{ParquetColumnSource, ReadOptions};

use crate::error::Result;

/// Contract for the external column reader
pub trait ColumnSource {
    /// Returns the number of physical columns in the file
    fn column_count(&self) -> usize;

    /// Returns the file metadata value stored under `key`
    fn metadata(&self, key: &str) -> Option<&[u8]>;

    /// Restricts reading to the given physical columns (ascending)
    ///
    /// Must be called before the first [`advance`](Self::advance).
    fn select_columns(&mut self, columns: &[usize]) -> Result<()>;

    /// Moves to the next record, returning false at the end of the split
    fn advance(&mut self) -> Result<bool>;

    /// Returns the current record, or `None` before the first record and
    /// after the last
    fn current(&self) -> Result<Option<RawRecord<'_>>>;
}

/// Byte ranges of one record, one per physical column
///
/// Columns that were not selected for reading are empty. The ranges borrow
/// from the source and are only valid until it advances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord<'a> {
    columns: Vec<&'a [u8]>,
}

impl<'a> RawRecord<'a> {
    /// Creates a record from per-column byte ranges
    pub fn new(columns: Vec<&'a [u8]>) -> Self {
        Self { columns }
    }

    /// Creates a record of `width` empty columns
    pub fn with_width(width: usize) -> Self {
        Self {
            columns: vec![&[][..]; width],
        }
    }

    /// Sets the bytes of one column
    ///
    /// # Panics
    ///
    /// Panics if `column` is not below the record width.
    pub fn set(&mut self, column: usize, bytes: &'a [u8]) {
        self.columns[column] = bytes;
    }

    /// Returns the bytes of one column
    pub fn column(&self, column: usize) -> Option<&'a [u8]> {
        self.columns.get(column).copied()
    }

    /// Number of physical columns in the record
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the record has no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Checks that a column selection is strictly ascending and in range
pub(crate) fn check_selection(columns: &[usize], column_count: usize) -> Result<()> {
    use crate::error::ColProtoError;

    if let Some(&column) = columns.iter().find(|&&c| c >= column_count) {
        return Err(ColProtoError::InvalidColumnSelection(format!(
            "column {} out of range ({} columns)",
            column, column_count
        )));
    }
    if columns.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(ColProtoError::InvalidColumnSelection(format!(
            "columns must be strictly ascending: {:?}",
            columns
        )));
    }
    Ok(())
}
