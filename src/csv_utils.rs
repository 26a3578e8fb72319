//! CSV helpers for the load harness.
//!
//! Reads id dumps asynchronously and writes report rows synchronously.

use csv_async::{AsyncReaderBuilder, Trim};
use serde::Serialize;
use std::io::Write;
use tokio::io::AsyncRead;
use tokio_stream::StreamExt;

/// Column header some dumps start with (`uid,delta`).
const ID_HEADER: &str = "uid";

/// Reads the first column of every row. Rows may carry extra columns, a
/// leading header row is skipped and blank values are dropped.
pub async fn read_first_column<R>(reader: R) -> csv_async::Result<Vec<String>>
where
    R: AsyncRead + Unpin + Send,
{
    let mut csv_reader = AsyncReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .create_reader(reader);

    let mut values = Vec::new();
    let mut records = csv_reader.records();
    let mut first = true;
    while let Some(record) = records.next().await {
        let record = record?;
        let value = record.get(0).unwrap_or_default();
        let is_header = first && value == ID_HEADER;
        first = false;
        if is_header || value.is_empty() {
            continue;
        }
        values.push(value.to_owned());
    }
    Ok(values)
}

/// Writes an iterator of records to a CSV writer.
/// Each record must implement Serialize.
pub fn write_csv<T, W>(writer: W, records: impl Iterator<Item = T>) -> csv::Result<()>
where
    T: Serialize,
    W: Write,
{
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}
