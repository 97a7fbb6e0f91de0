use crate::io::GeometrySink;
use crate::io::results::Streamline;
use anyhow::{Context, Result};
use csv::{Writer, WriterBuilder};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes streamline points as CSV rows, one column per output field.
/// CSV has no place for the CRS tag, so it is dropped.
pub struct CsvSink<W: Write> {
    writer: Writer<W>,
}

impl<W: Write> CsvSink<W> {
    pub fn from_writer(inner: W) -> Self {
        CsvSink {
            writer: WriterBuilder::new().has_headers(false).from_writer(inner),
        }
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush CSV writer: {}", e.error()))
    }
}

impl<W: Write> GeometrySink for CsvSink<W> {
    fn write_streamline(&mut self, streamline: &Streamline) -> Result<()> {
        self.writer.write_record(streamline.fields())?;
        for point in &streamline.points {
            self.writer
                .write_record(point.attributes().iter().map(|v| v.to_string()))?;
        }
        self.writer.flush().context("Failed to flush CSV writer")?;
        Ok(())
    }
}

// Create CSV sink for a file path
pub fn create_csv_sink(path: &Path) -> Result<CsvSink<File>> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create CSV file: {:?}", path))?;
    Ok(CsvSink::from_writer(file))
}
