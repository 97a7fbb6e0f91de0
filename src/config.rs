use crate::error::{FlowlineError, Result};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_ENV_NAME: &str = "GMT6";
pub const TOOL_NAME: &str = "grd2stream";

// Platform the command is rendered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Platform {
    Posix,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Posix
        }
    }
}

/// Extra columns requested from grd2stream. `None` on a record means the
/// default `x y dist` layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum OutputFormat {
    /// `-l`: adds the velocity components
    #[serde(rename = "-l")]
    Velocity,
    /// `-t`: adds velocity and travel time
    #[serde(rename = "-t")]
    Time,
}

impl OutputFormat {
    pub fn flag(self) -> &'static str {
        match self {
            OutputFormat::Velocity => "-l",
            OutputFormat::Time => "-t",
        }
    }
}

/// Column names of one output row for the given format.
pub fn output_fields(format: Option<OutputFormat>) -> &'static [&'static str] {
    match format {
        None => &["x", "y", "dist"],
        Some(OutputFormat::Velocity) => &["x", "y", "dist", "v_x", "v_y"],
        Some(OutputFormat::Time) => &["x", "y", "dist", "v_x", "v_y", "time"],
    }
}

fn default_band() -> u32 {
    1
}

/// The parameter set that is persisted in presets and drives one run.
///
/// Optional fields accept both `null` and a missing key when read back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRecord {
    #[serde(default)]
    pub raster_1_source: String,
    #[serde(default)]
    pub raster_1_name: String,
    #[serde(default)]
    pub raster_2_source: String,
    #[serde(default)]
    pub raster_2_name: String,
    #[serde(default = "default_band")]
    pub band_1: u32,
    #[serde(default = "default_band")]
    pub band_2: u32,
    #[serde(default)]
    pub backward_steps: bool,
    #[serde(default)]
    pub step_size: Option<f64>,
    #[serde(default)]
    pub max_integration_time: Option<f64>,
    #[serde(default)]
    pub max_steps: Option<u32>,
    #[serde(default)]
    pub output_format: Option<OutputFormat>,
    #[serde(default)]
    pub last_edited: Option<DateTime<Utc>>,
}

impl Default for ParameterRecord {
    fn default() -> Self {
        ParameterRecord {
            raster_1_source: String::new(),
            raster_1_name: String::new(),
            raster_2_source: String::new(),
            raster_2_name: String::new(),
            band_1: 1,
            band_2: 1,
            backward_steps: false,
            step_size: None,
            max_integration_time: None,
            max_steps: None,
            output_format: None,
            last_edited: None,
        }
    }
}

impl ParameterRecord {
    pub fn touch(&mut self) {
        self.last_edited = Some(Utc::now());
    }

    /// Checks the numeric fields of a record that did not come through
    /// [`NumericInputs`], e.g. one read from a preset file.
    pub fn validate(&self) -> Result<()> {
        if self.band_1 == 0 || self.band_2 == 0 {
            return Err(FlowlineError::config("Band numbers start at 1."));
        }
        if let Some(step) = self.step_size {
            ensure_positive("Step Size", step)?;
        }
        if let Some(time) = self.max_integration_time {
            ensure_positive("Max Integration Time", time)?;
        }
        if self.max_steps == Some(0) {
            return Err(FlowlineError::config(
                "Invalid 'Maximum Number of Steps'. Please enter a positive integer.",
            ));
        }
        Ok(())
    }
}

fn ensure_positive(label: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(FlowlineError::config(format!(
            "Invalid '{}'. Please enter a positive number.",
            label
        )))
    }
}

fn parse_float_input(label: &str, text: Option<&str>) -> Result<Option<f64>> {
    let text = match text.map(str::trim) {
        Some(t) if !t.is_empty() => t,
        _ => return Ok(None),
    };
    if text.contains(',') {
        return Err(FlowlineError::config(format!(
            "Please use a period (.) instead of a comma (,) as decimal separator in '{}'.",
            label
        )));
    }
    let value = text.parse::<f64>().map_err(|_| {
        FlowlineError::config(format!("Invalid '{}'. Please enter a valid number.", label))
    })?;
    ensure_positive(label, value)?;
    Ok(Some(value))
}

/// Raw numeric options as typed by the user, before validation.
#[derive(Debug, Clone, Default)]
pub struct NumericInputs {
    pub step_size: Option<String>,
    pub max_integration_time: Option<String>,
    pub max_steps: Option<String>,
}

impl NumericInputs {
    /// Validates every field and writes the parsed values into `record`.
    /// The record is left untouched when any field is rejected.
    pub fn apply(&self, record: &mut ParameterRecord) -> Result<()> {
        let step_size = parse_float_input("Step Size", self.step_size.as_deref())?;
        let max_integration_time =
            parse_float_input("Max Integration Time", self.max_integration_time.as_deref())?;

        let max_steps = match self.max_steps.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => {
                let steps = t.parse::<u32>().ok().filter(|n| *n > 0).ok_or_else(|| {
                    FlowlineError::config(
                        "Invalid 'Maximum Number of Steps'. Please enter a valid integer.",
                    )
                })?;
                Some(steps)
            }
            _ => None,
        };

        record.step_size = step_size;
        record.max_integration_time = max_integration_time;
        record.max_steps = max_steps;
        Ok(())
    }
}

/// Where the grd2stream binary and its conda environment live.
#[derive(Debug, Clone)]
pub struct ToolConfig {
    pub conda_root: PathBuf,
    pub env_name: String,
    /// A grd2stream binary outside the managed environment; invoked directly.
    pub tool_override: Option<PathBuf>,
}

impl ToolConfig {
    pub fn new(conda_root: PathBuf) -> Self {
        ToolConfig {
            conda_root,
            env_name: DEFAULT_ENV_NAME.to_string(),
            tool_override: None,
        }
    }

    /// `$HOME/miniconda3`, or the current directory when HOME is unset.
    pub fn default_conda_root() -> PathBuf {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_default()
            .join("miniconda3")
    }

    pub fn launcher(&self) -> PathBuf {
        self.conda_root.join("bin").join("conda")
    }

    pub fn env_path(&self) -> PathBuf {
        self.conda_root.join("envs").join(&self.env_name)
    }

    pub fn tool_path(&self) -> PathBuf {
        match &self.tool_override {
            Some(path) => path.clone(),
            None => self.env_path().join("bin").join(TOOL_NAME),
        }
    }

    pub fn uses_launcher(&self) -> bool {
        self.tool_override.is_none()
    }

    /// Verifies that the tool can be started on this platform.
    pub fn check_available(&self, platform: Platform) -> Result<()> {
        if platform == Platform::Windows {
            return Err(FlowlineError::ToolUnavailable(
                "grd2stream is not accessible on Windows; the command can only be displayed."
                    .to_string(),
            ));
        }
        if self.uses_launcher() && !self.launcher().exists() {
            return Err(FlowlineError::ToolUnavailable(format!(
                "Conda launcher not found at {}. Install Miniconda and create the '{}' environment with GMT 6 first.",
                self.launcher().display(),
                self.env_name
            )));
        }
        let tool = self.tool_path();
        if !tool.exists() {
            return Err(FlowlineError::ToolUnavailable(format!(
                "grd2stream not found at {}. Install it into the '{}' environment first.",
                tool.display(),
                self.env_name
            )));
        }
        Ok(())
    }
}

/// Advice for a missing install, or `None` where the tool can never run.
pub fn provisioning_hint(platform: Platform) -> Option<&'static str> {
    match platform {
        Platform::Windows => None,
        Platform::Posix => Some(
            "Provision the conda environment with GMT 6 and build grd2stream into it, then run `check` again.",
        ),
    }
}
