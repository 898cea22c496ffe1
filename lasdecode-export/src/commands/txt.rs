use crate::cli::TxtOptions;
use anyhow::{bail, Context, Result};
use lasdecode_common::geometry::projector::OutputRow;
use lasdecode_common::las::LasFile;
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};

pub fn txt(options: TxtOptions) -> Result<()> {
    if !options.delimiter.is_ascii() {
        bail!(
            "The delimiter must be an ascii character, got {:?}.",
            options.delimiter
        );
    }

    let las = LasFile::from_path(&options.input_file)
        .with_context(|| format!("Failed to decode {}", options.input_file.display()))?;
    info!(
        "Read {} points (LAS {}, point format {}) from {}",
        las.points.len(),
        las.header.version,
        las.header.point_data_record_format,
        options.input_file.display()
    );

    let file = File::create(&options.output_file)
        .with_context(|| format!("Failed to create {}", options.output_file.display()))?;
    let nr_rows = write_rows(
        las.output_rows(),
        BufWriter::new(file),
        options.header,
        options.delimiter as u8,
    )
    .with_context(|| format!("Failed to write {}", options.output_file.display()))?;
    info!(
        "Wrote {nr_rows} rows to {}",
        options.output_file.display()
    );
    Ok(())
}

/// Writes one delimited `X,Y,Z,R,G,B` line per row. Returns the number of rows written.
pub fn write_rows<W: Write>(
    rows: impl Iterator<Item = OutputRow>,
    writer: W,
    header: bool,
    delimiter: u8,
) -> Result<usize> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(header)
        .delimiter(delimiter)
        .from_writer(writer);
    let mut nr_rows = 0;
    for row in rows {
        wtr.serialize(row)?;
        nr_rows += 1;
    }
    wtr.flush()?;
    Ok(nr_rows)
}
