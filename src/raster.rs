use crate::error::{FlowlineError, Result};
use std::path::{Path, PathBuf};

/// GDAL driver prefixes that grd2stream does not understand.
pub const DRIVER_PREFIXES: [&str; 3] = ["NETCDF:", "HDF5:", "GRIB:"];

// Splits a raster source into its dataset path and optional subvariable.
// Only the remainder after a driver prefix is trimmed. The last colon is the
// split point unless everything before it is a single drive letter.
fn split_source(source: &str) -> (String, Option<String>) {
    let rest = DRIVER_PREFIXES
        .iter()
        .find_map(|prefix| source.strip_prefix(prefix))
        .map(str::trim)
        .unwrap_or(source);

    match rest.rsplit_once(':') {
        Some((path, variable))
            if !path.is_empty() && !variable.is_empty() && !is_drive_letter(path) =>
        {
            (unquote(path), Some(variable.to_string()))
        }
        _ => (unquote(rest), None),
    }
}

fn is_drive_letter(path: &str) -> bool {
    let mut chars = path.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_alphabetic())
}

// GDAL quotes subdataset paths that contain spaces
fn unquote(path: &str) -> String {
    path.trim_matches('"').to_string()
}

/// Rewrites a raster source identifier into the `path?variable` form that
/// grd2stream (GMT grid syntax) expects.
///
/// `NETCDF:/a/b.nc:velocity` becomes `/a/b.nc?velocity`; a plain path is
/// returned unchanged. The rule is the same on every platform.
pub fn normalize(source: &str) -> String {
    match split_source(source) {
        (path, Some(variable)) => format!("{}?{}", path, variable),
        (path, None) => path,
    }
}

/// File on disk that backs a raster source.
pub fn dataset_path(source: &str) -> PathBuf {
    PathBuf::from(split_source(source).0)
}

/// Handle on one selected raster layer.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterLayer {
    pub source: String,
    pub name: String,
}

impl RasterLayer {
    pub fn new(source: &str, name: &str) -> Self {
        let name = if name.trim().is_empty() {
            default_layer_name(source)
        } else {
            name.to_string()
        };
        RasterLayer {
            source: source.to_string(),
            name,
        }
    }

    /// Re-opens a layer by source. Only availability of the dataset file is
    /// checked, not its content.
    pub fn open(source: &str, name: &str) -> Result<Self> {
        if source.trim().is_empty() {
            return Err(FlowlineError::config("Raster source is empty."));
        }
        let layer = RasterLayer::new(source, name);
        if !layer.is_available() {
            return Err(FlowlineError::config(format!(
                "Could not load raster layer '{}' from {}. The file may have moved or changed.",
                layer.name,
                dataset_path(source).display()
            )));
        }
        Ok(layer)
    }

    pub fn is_available(&self) -> bool {
        dataset_path(&self.source).is_file()
    }
}

fn default_layer_name(source: &str) -> String {
    let (path, variable) = split_source(source);
    let stem = Path::new(&path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or(path.clone());
    match variable {
        Some(var) => format!("{} {}", stem, var),
        None => stem,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_subdataset_becomes_query() {
        assert_eq!(normalize("NETCDF:/a/b.nc:velocity"), "/a/b.nc?velocity");
        assert_eq!(normalize("HDF5:/data/ice.h5:vx"), "/data/ice.h5?vx");
        assert_eq!(normalize("GRIB: /data/wind.grb:u "), "/data/wind.grb?u");
    }

    #[test]
    fn plain_paths_are_identity() {
        for source in ["/data/vx.tif", "relative/vy.grd", "vx.nc", ""] {
            assert_eq!(normalize(source), source);
        }
    }

    #[test]
    fn prefix_without_variable_is_stripped() {
        assert_eq!(normalize("NETCDF:/a/b.nc"), "/a/b.nc");
    }

    #[test]
    fn splits_on_last_colon_only() {
        assert_eq!(
            normalize(r"NETCDF:C:\data\ice.nc:vx"),
            r"C:\data\ice.nc?vx"
        );
        assert_eq!(normalize("/a/b:c.nc:var"), "/a/b:c.nc?var");
    }

    #[test]
    fn drive_letter_alone_is_not_a_variable() {
        assert_eq!(normalize(r"C:\data\vx.tif"), r"C:\data\vx.tif");
    }

    #[test]
    fn quoted_gdal_paths_lose_quotes() {
        assert_eq!(
            normalize(r#"NETCDF:"/my data/ice.nc":vy"#),
            "/my data/ice.nc?vy"
        );
    }

    #[test]
    fn hdf5_group_paths_split_on_last_colon() {
        assert_eq!(
            normalize("HDF5:/data/ice.h5://science/vx"),
            "/data/ice.h5?//science/vx"
        );
        assert_eq!(
            normalize(r"HDF5:C:\data\ice.h5://science/vy"),
            r"C:\data\ice.h5?//science/vy"
        );
    }

    #[test]
    fn unprefixed_source_is_not_trimmed() {
        assert_eq!(normalize(" /data/vx.tif "), " /data/vx.tif ");
    }

    #[test]
    fn quoted_path_without_variable_loses_quotes() {
        assert_eq!(normalize(r#"NETCDF:"/my data/ice.nc""#), "/my data/ice.nc");
    }

    #[test]
    fn dataset_path_drops_variable() {
        assert_eq!(
            dataset_path("NETCDF:/a/b.nc:velocity"),
            PathBuf::from("/a/b.nc")
        );
    }

    #[test]
    fn open_checks_availability() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("vel.nc");
        std::fs::write(&file, b"").unwrap();
        let source = format!("NETCDF:{}:vx", file.display());

        let layer = RasterLayer::open(&source, "").unwrap();
        assert_eq!(layer.name, "vel vx");
        assert_eq!(normalize(&layer.source), format!("{}?vx", file.display()));

        let missing = dir.path().join("gone.nc");
        let err = RasterLayer::open(missing.to_str().unwrap(), "gone").unwrap_err();
        assert!(matches!(err, FlowlineError::Configuration(_)));
    }
}
