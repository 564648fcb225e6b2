//! CSV serialization of generated tables.

use std::io::Write;

use kimport_tabular::ColumnBatch;

use crate::error::Result;

/// Write a batch as CSV with a header row. Null cells are written empty.
///
/// Cells use their canonical key rendering, so narrowed columns serialize
/// exactly as their wide originals.
pub fn write_table_csv<W: Write>(batch: &ColumnBatch, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(batch.schema.names())?;

    let mut record: Vec<String> = Vec::with_capacity(batch.columns.len());
    for row in 0..batch.num_rows {
        record.clear();
        record.extend(
            batch
                .columns
                .iter()
                .map(|col| col.key(row).map(|k| k.into_owned()).unwrap_or_default()),
        );
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}
