use std::io::Write;

use datasynth_core::{Field, Row};

use crate::errors::OutputError;

/// Write rows as CSV: a header in request field order, then one record per
/// row with missing cells left empty.
pub fn write_dataset_csv<W: Write>(
    writer: W,
    fields: &[Field],
    rows: &[Row],
) -> Result<(), OutputError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    writer.write_record(fields.iter().map(|field| field.name.as_str()))?;
    for row in rows {
        writer.write_record(
            fields
                .iter()
                .map(|field| row.get(&field.name).unwrap_or_default()),
        )?;
    }

    writer.flush()?;
    Ok(())
}
