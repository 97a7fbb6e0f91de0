use crate::config::{NumericInputs, OutputFormat, ParameterRecord};
use crate::error::{FlowlineError, Result};
use crate::preset::PresetStore;
use crate::raster::RasterLayer;
use tracing::info;

/// Options chosen alongside the two rasters.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub backward_steps: bool,
    pub output_format: Option<OutputFormat>,
    pub numeric: NumericInputs,
}

// Parameters of the current session, shared by the UI and the command builder
#[derive(Debug, Default)]
pub struct SessionState {
    pub raster_1: Option<RasterLayer>,
    pub raster_2: Option<RasterLayer>,
    pub record: ParameterRecord,
    pub coordinate: Option<(f64, f64)>,
    pub last_used_preset: Option<String>,
}

impl SessionState {
    pub fn new() -> Self {
        SessionState::default()
    }

    /// Applies a manual selection. Nothing changes if it is rejected.
    pub fn select(
        &mut self,
        raster_1: (RasterLayer, u32),
        raster_2: (RasterLayer, u32),
        options: &RunOptions,
    ) -> Result<()> {
        let (layer_1, band_1) = raster_1;
        let (layer_2, band_2) = raster_2;
        if band_1 == 0 || band_2 == 0 {
            return Err(FlowlineError::config("Band numbers start at 1."));
        }
        if layer_1.source == layer_2.source && band_1 == band_2 {
            return Err(FlowlineError::config(
                "Please select two different raster layers/bands.",
            ));
        }

        let mut record = ParameterRecord {
            band_1,
            band_2,
            backward_steps: options.backward_steps,
            output_format: options.output_format,
            ..Default::default()
        };
        options.numeric.apply(&mut record)?;
        fill_sources(&mut record, &layer_1, &layer_2);

        self.raster_1 = Some(layer_1);
        self.raster_2 = Some(layer_2);
        self.record = record;
        self.last_used_preset = None;
        Ok(())
    }

    /// Loads a preset and re-opens its rasters.
    pub fn apply_preset(&mut self, store: &PresetStore, name: &str) -> Result<()> {
        let record = store
            .get(name)
            .ok_or_else(|| FlowlineError::config(format!("Could not load preset '{}'.", name)))?;
        record.validate()?;
        let layer_1 = RasterLayer::open(&record.raster_1_source, &record.raster_1_name)?;
        let layer_2 = RasterLayer::open(&record.raster_2_source, &record.raster_2_name)?;

        self.raster_1 = Some(layer_1);
        self.raster_2 = Some(layer_2);
        self.record = record.clone();
        self.last_used_preset = Some(name.to_string());
        info!("Preset '{}' loaded", name);
        Ok(())
    }

    pub fn set_coordinate(&mut self, x: f64, y: f64) {
        self.coordinate = Some((x, y));
    }

    /// Current selection as a record, or `None` when no rasters are chosen.
    pub fn last_settings(&self) -> Option<ParameterRecord> {
        let (layer_1, layer_2) = (self.raster_1.as_ref()?, self.raster_2.as_ref()?);
        let mut record = self.record.clone();
        fill_sources(&mut record, layer_1, layer_2);
        Some(record)
    }

    /// The record the command is built from. Fails if rasters are missing.
    pub fn snapshot(&self) -> Result<ParameterRecord> {
        self.last_settings().ok_or_else(|| {
            FlowlineError::config("Please select input rasters before saving preset.")
        })
    }

    /// Stores the current selection as a preset. An existing name is only
    /// replaced when `overwrite` is set.
    pub fn save_as_preset(&self, store: &mut PresetStore, name: &str, overwrite: bool) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FlowlineError::config("Please enter a name for the preset."));
        }
        if store.contains(name) && !overwrite {
            return Err(FlowlineError::config(format!(
                "Preset '{}' already exists.",
                name
            )));
        }
        let record = self.snapshot()?;
        let saved = if store.contains(name) {
            store.update(name, record)
        } else {
            store.add(name, record)
        };
        if saved {
            Ok(())
        } else {
            Err(FlowlineError::StoreIo(format!("Failed to save preset '{}'.", name)))
        }
    }
}

fn fill_sources(record: &mut ParameterRecord, layer_1: &RasterLayer, layer_2: &RasterLayer) {
    record.raster_1_source = layer_1.source.clone();
    record.raster_1_name = layer_1.name.clone();
    record.raster_2_source = layer_2.source.clone();
    record.raster_2_name = layer_2.name.clone();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn layers(dir: &Path) -> (RasterLayer, RasterLayer) {
        let vx = dir.join("vx.tif");
        let vy = dir.join("vy.tif");
        std::fs::write(&vx, b"").unwrap();
        std::fs::write(&vy, b"").unwrap();
        (
            RasterLayer::new(vx.to_str().unwrap(), "vx"),
            RasterLayer::new(vy.to_str().unwrap(), "vy"),
        )
    }

    #[test]
    fn empty_session_has_no_last_settings() {
        let session = SessionState::new();
        assert!(session.last_settings().is_none());
        assert!(session.snapshot().is_err());
    }

    #[test]
    fn identical_layer_and_band_rejected() {
        let dir = tempdir().unwrap();
        let (vx, _) = layers(dir.path());
        let mut session = SessionState::new();
        let err = session
            .select((vx.clone(), 1), (vx, 1), &RunOptions::default())
            .unwrap_err();
        assert!(matches!(err, FlowlineError::Configuration(_)));
        assert!(session.raster_1.is_none());
    }

    #[test]
    fn bad_numeric_input_keeps_previous_selection() {
        let dir = tempdir().unwrap();
        let (vx, vy) = layers(dir.path());
        let mut session = SessionState::new();
        session
            .select((vx.clone(), 1), (vy.clone(), 1), &RunOptions::default())
            .unwrap();
        let options = RunOptions {
            numeric: NumericInputs {
                max_integration_time: Some("1,5".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(session.select((vx, 2), (vy, 2), &options).is_err());
        assert_eq!(session.record.band_1, 1);
    }

    #[test]
    fn preset_round_trip_sets_last_used() {
        let dir = tempdir().unwrap();
        let (vx, vy) = layers(dir.path());
        let mut store = PresetStore::open(dir.path().join("presets.json"));

        let mut session = SessionState::new();
        let options = RunOptions {
            backward_steps: true,
            output_format: Some(OutputFormat::Velocity),
            numeric: NumericInputs {
                step_size: Some("500".to_string()),
                ..Default::default()
            },
        };
        session.select((vx, 1), (vy, 1), &options).unwrap();
        session.save_as_preset(&mut store, "ice", false).unwrap();
        assert!(session.save_as_preset(&mut store, "ice", false).is_err());
        session.save_as_preset(&mut store, "ice", true).unwrap();

        let mut restored = SessionState::new();
        restored.apply_preset(&store, "ice").unwrap();
        assert_eq!(restored.last_used_preset.as_deref(), Some("ice"));
        assert_eq!(restored.record.step_size, Some(500.0));
        assert_eq!(restored.raster_2.as_ref().unwrap().name, "vy");

        // a fresh manual selection forgets the preset
        let (vx, vy) = layers(dir.path());
        restored.select((vx, 1), (vy, 1), &RunOptions::default()).unwrap();
        assert_eq!(restored.last_used_preset, None);
    }

    #[test]
    fn preset_with_moved_files_fails() {
        let dir = tempdir().unwrap();
        let (vx, vy) = layers(dir.path());
        let mut store = PresetStore::open(dir.path().join("presets.json"));
        let mut session = SessionState::new();
        session.select((vx.clone(), 1), (vy, 1), &RunOptions::default()).unwrap();
        session.save_as_preset(&mut store, "p", false).unwrap();
        std::fs::remove_file(&vx.source).unwrap();

        let mut restored = SessionState::new();
        assert!(restored.apply_preset(&store, "p").is_err());
        assert!(restored.apply_preset(&store, "unknown").is_err());
        assert!(restored.last_used_preset.is_none());
    }
}
