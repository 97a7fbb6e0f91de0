pub mod csv;
pub mod geojson;
pub mod results;

use results::Streamline;

/// Receives finished streamlines, e.g. a file on disk or a map layer.
pub trait GeometrySink {
    fn write_streamline(&mut self, streamline: &Streamline) -> anyhow::Result<()>;
}
