//! Apache Parquet output for offline materialization.

use std::io::Write;
use std::sync::Arc;

use arrow::json::ReaderBuilder;
use arrow::json::reader::infer_json_schema_from_iterator;
use candela_types::Record;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde_json::Value;

use crate::StoreError;

/// Rows decoded into one Arrow record batch.
const ROW_GROUP_SIZE: usize = 100_000;

/// Writes records as a single Parquet file.
///
/// The Arrow schema is inferred from the records; integer and float values in
/// the same field widen to `Float64`. Returns the number of rows written;
/// an empty slice writes nothing.
///
/// # Errors
///
/// Returns [`StoreError::Parquet`] if schema inference, decoding or writing
/// fails.
pub fn write_records<W: Write + Send>(records: &[Record], writer: W) -> Result<usize, StoreError> {
    if records.is_empty() {
        return Ok(0);
    }
    let schema = Arc::new(
        infer_json_schema_from_iterator(records.iter().map(|r| Ok(Value::Object(r.clone()))))
            .map_err(parquet_error)?,
    );
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .set_max_row_group_size(ROW_GROUP_SIZE)
        .build();

    let mut arrow_writer =
        ArrowWriter::try_new(writer, Arc::clone(&schema), Some(props)).map_err(parquet_error)?;

    for chunk in records.chunks(ROW_GROUP_SIZE) {
        let mut decoder = ReaderBuilder::new(Arc::clone(&schema))
            .with_batch_size(chunk.len())
            .build_decoder()
            .map_err(parquet_error)?;
        decoder.serialize(chunk).map_err(parquet_error)?;
        if let Some(batch) = decoder.flush().map_err(parquet_error)? {
            arrow_writer.write(&batch).map_err(parquet_error)?;
        }
    }

    arrow_writer.close().map_err(parquet_error)?;
    Ok(records.len())
}

fn parquet_error(e: impl std::fmt::Display) -> StoreError {
    StoreError::Parquet(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parquet::file::reader::{FileReader, SerializedFileReader};
    use serde_json::json;

    fn record(ts: i64, close: f64) -> Record {
        match json!({"product_id": "BTC/USD", "timestamp_ms": ts, "close": close, "trade_count": 3}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_write_records() {
        let mut output = Vec::new();
        let rows = write_records(&[record(10_000, 1.5), record(20_000, 2.5)], &mut output).unwrap();
        assert_eq!(rows, 2);

        // Parquet files start with "PAR1" magic bytes
        assert!(output.len() > 4);
        assert_eq!(&output[0..4], b"PAR1");

        let reader = SerializedFileReader::new(bytes::Bytes::from(output)).unwrap();
        let metadata = reader.metadata();
        assert_eq!(metadata.file_metadata().num_rows(), 2);
        let schema = metadata.file_metadata().schema_descr();
        let columns: Vec<&str> = schema.columns().iter().map(|c| c.name()).collect();
        assert!(columns.contains(&"product_id"));
        assert!(columns.contains(&"close"));
    }
}
