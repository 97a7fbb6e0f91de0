use crate::io::GeometrySink;
use crate::io::results::Streamline;
use anyhow::{Context, Result};
use serde_json::{Map, Value, json};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes a streamline as a GeoJSON FeatureCollection of points.
pub struct GeoJsonSink<W: Write> {
    inner: W,
}

impl<W: Write> GeoJsonSink<W> {
    pub fn from_writer(inner: W) -> Self {
        GeoJsonSink { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

fn feature_collection(streamline: &Streamline) -> Value {
    let fields = streamline.fields();
    let features: Vec<Value> = streamline
        .points
        .iter()
        .map(|point| {
            let properties: Map<String, Value> = fields
                .iter()
                .zip(point.attributes())
                .map(|(name, value)| (name.to_string(), json!(value)))
                .collect();
            json!({
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [point.x, point.y] },
                "properties": properties,
            })
        })
        .collect();

    json!({
        "type": "FeatureCollection",
        "name": streamline.name,
        "crs": { "type": "name", "properties": { "name": streamline.crs } },
        "features": features,
    })
}

impl<W: Write> GeometrySink for GeoJsonSink<W> {
    fn write_streamline(&mut self, streamline: &Streamline) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.inner, &feature_collection(streamline))
            .context("Failed to write GeoJSON")?;
        writeln!(self.inner)?;
        self.inner.flush()?;
        Ok(())
    }
}

pub fn create_geojson_sink(path: &Path) -> Result<GeoJsonSink<BufWriter<File>>> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create GeoJSON file: {:?}", path))?;
    Ok(GeoJsonSink::from_writer(BufWriter::new(file)))
}
