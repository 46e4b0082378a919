//! Parquet-backed column source
//!
//! Each physical column is a root-level `Binary` column; the stored field list
//! lives in the file's key/value metadata. A split is a contiguous range of
//! row groups.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use arrow::array::{Array, BinaryArray, RecordBatch};
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};
use parquet::arrow::ProjectionMask;
use parquet::file::reader::ChunkReader;
use tracing::{debug, info};

use super::validation::validate_schema;
use super::{check_selection, ColumnSource, RawRecord};
use crate::error::{ColProtoError, Result};

/// Configuration for reading a split of a parquet file
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Starting row group index (0-based)
    pub start_row_group: usize,
    /// Number of row groups to read (0 = all remaining)
    pub total_row_groups: usize,
    /// Number of rows decoded per batch
    pub batch_size: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            start_row_group: 0,
            total_row_groups: 0,
            batch_size: 1024,
        }
    }
}

/// Column source over a parquet file
pub struct ParquetColumnSource<T: ChunkReader + 'static> {
    /// Builder awaiting the column selection; taken on the first advance
    builder: Option<ParquetRecordBatchReaderBuilder<T>>,

    /// Batch reader, present once iteration started
    reader: Option<ParquetRecordBatchReader>,

    /// File key/value metadata
    metadata: HashMap<String, String>,

    /// Number of root columns in the file
    column_count: usize,

    /// Physical columns being read, in ascending order
    selected: Vec<usize>,

    current_batch: Option<RecordBatch>,
    current_row: usize,
}

impl ParquetColumnSource<File> {
    /// Opens a parquet file for reading
    pub fn open<P: AsRef<Path>>(path: P, options: ReadOptions) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening column file");
        let file = File::open(path)?;
        Self::try_new(file, options)
    }
}

impl<T: ChunkReader + 'static> ParquetColumnSource<T> {
    /// Creates a source from any parquet chunk reader (file handle, in-memory bytes)
    pub fn try_new(reader: T, options: ReadOptions) -> Result<Self> {
        let builder = ParquetRecordBatchReaderBuilder::try_new(reader)?;
        validate_schema(builder.schema())?;

        let metadata: HashMap<String, String> = builder
            .metadata()
            .file_metadata()
            .key_value_metadata()
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|kv| kv.value.clone().map(|value| (kv.key.clone(), value)))
                    .collect()
            })
            .unwrap_or_default();

        let num_row_groups = builder.metadata().num_row_groups();
        let column_count = builder.schema().fields().len();

        // Determine row group range
        let start = options.start_row_group;
        if start > 0 && start >= num_row_groups {
            return Err(ColProtoError::InvalidRowGroup(format!(
                "start_row_group {} >= total row groups {}",
                start, num_row_groups
            )));
        }
        let remaining = num_row_groups - start;
        let total = if options.total_row_groups == 0 {
            remaining
        } else {
            options.total_row_groups.min(remaining)
        };

        info!(
            start_row_group = start,
            row_groups = total,
            columns = column_count,
            "reading column file split"
        );

        let builder = builder
            .with_row_groups((start..start + total).collect())
            .with_batch_size(options.batch_size.max(1));

        Ok(Self {
            builder: Some(builder),
            reader: None,
            metadata,
            column_count,
            selected: (0..column_count).collect(),
            current_batch: None,
            current_row: 0,
        })
    }

    /// Physical columns that will be read
    pub fn selected_columns(&self) -> &[usize] {
        &self.selected
    }

    /// Builds the batch reader with the current column selection
    fn start(&mut self) -> Result<()> {
        let builder = self
            .builder
            .take()
            .ok_or_else(|| ColProtoError::InvalidState("column file already started".into()))?;

        let projection =
            ProjectionMask::roots(builder.parquet_schema(), self.selected.iter().copied());
        self.reader = Some(builder.with_projection(projection).build()?);
        Ok(())
    }
}

impl<T: ChunkReader + 'static> ColumnSource for ParquetColumnSource<T> {
    fn column_count(&self) -> usize {
        self.column_count
    }

    fn metadata(&self, key: &str) -> Option<&[u8]> {
        self.metadata.get(key).map(|value| value.as_bytes())
    }

    fn select_columns(&mut self, columns: &[usize]) -> Result<()> {
        if self.builder.is_none() {
            return Err(ColProtoError::InvalidState(
                "columns must be selected before iteration begins".into(),
            ));
        }
        check_selection(columns, self.column_count)?;
        self.selected = columns.to_vec();
        Ok(())
    }

    fn advance(&mut self) -> Result<bool> {
        if self.reader.is_none() {
            self.start()?;
        }

        if let Some(batch) = &self.current_batch {
            if self.current_row + 1 < batch.num_rows() {
                self.current_row += 1;
                return Ok(true);
            }
        }

        let Some(reader) = self.reader.as_mut() else {
            return Ok(false);
        };

        // Skip empty batches until a row is available or the split ends
        loop {
            match reader.next().transpose()? {
                Some(batch) if batch.num_rows() == 0 => continue,
                Some(batch) => {
                    self.current_batch = Some(batch);
                    self.current_row = 0;
                    return Ok(true);
                }
                None => {
                    self.current_batch = None;
                    return Ok(false);
                }
            }
        }
    }

    fn current(&self) -> Result<Option<RawRecord<'_>>> {
        let Some(batch) = &self.current_batch else {
            return Ok(None);
        };

        let mut record = RawRecord::with_width(self.column_count);
        for (index, &column) in self.selected.iter().enumerate() {
            let values = batch
                .column(index)
                .as_any()
                .downcast_ref::<BinaryArray>()
                .ok_or_else(|| ColProtoError::InvalidColumnType {
                    column: batch.schema().field(index).name().clone(),
                    expected: "Binary".to_string(),
                    actual: format!("{:?}", batch.column(index).data_type()),
                })?;

            // Nulls read as empty, i.e. unset
            if !values.is_null(self.current_row) {
                record.set(column, values.value(self.current_row));
            }
        }

        Ok(Some(record))
    }
}
