use crate::config::{ParameterRecord, Platform, TOOL_NAME, ToolConfig};
use crate::error::{FlowlineError, Result};
use crate::raster::normalize;

/// Stand-in for the seed file when a command is only displayed.
pub const SEED_PLACEHOLDER: &str = "<seed_file_path>";

// Double-quotes an argument for sh, escaping what stays special inside.
fn quote(arg: &str) -> String {
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    for c in arg.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Renders grd2stream command lines for one platform and install layout.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    pub platform: Platform,
    pub tool: ToolConfig,
}

impl CommandBuilder {
    pub fn new(platform: Platform, tool: ToolConfig) -> Self {
        CommandBuilder { platform, tool }
    }

    fn prefix(&self) -> String {
        match self.platform {
            Platform::Windows => TOOL_NAME.to_string(),
            Platform::Posix if self.tool.uses_launcher() => format!(
                "{} run -n {} {}",
                quote(&self.tool.launcher().to_string_lossy()),
                self.tool.env_name,
                quote(&self.tool.tool_path().to_string_lossy())
            ),
            Platform::Posix => quote(&self.tool.tool_path().to_string_lossy()),
        }
    }

    /// Builds the shell command for two raster sources and a seed file.
    ///
    /// Flags always follow the order `-f`, `-b`, `-d`, `-T`, `-n`, format, so
    /// the same inputs give a byte-identical command.
    pub fn build(
        &self,
        record: &ParameterRecord,
        raster_path_1: &str,
        raster_path_2: &str,
        seed_file_path: &str,
    ) -> Result<String> {
        if raster_path_1.trim().is_empty() || raster_path_2.trim().is_empty() {
            return Err(FlowlineError::config("Two raster layers must be selected."));
        }
        if raster_path_1.trim() == raster_path_2.trim() && record.band_1 == record.band_2 {
            return Err(FlowlineError::config(
                "Please select two different raster layers/bands.",
            ));
        }

        let mut cmd = format!(
            "{} {} {} -f {}",
            self.prefix(),
            quote(&normalize(raster_path_1)),
            quote(&normalize(raster_path_2)),
            quote(seed_file_path)
        );
        if record.backward_steps {
            cmd.push_str(" -b");
        }
        if let Some(step) = record.step_size {
            cmd.push_str(&format!(" -d {}", step));
        }
        if let Some(time) = record.max_integration_time {
            cmd.push_str(&format!(" -T {}", time));
        }
        if let Some(steps) = record.max_steps {
            cmd.push_str(&format!(" -n {}", steps));
        }
        if let Some(format) = record.output_format {
            cmd.push_str(&format!(" {}", format.flag()));
        }
        Ok(cmd)
    }

    /// Builds from the raster sources stored in the record itself.
    pub fn build_for_record(&self, record: &ParameterRecord, seed_file_path: &str) -> Result<String> {
        self.build(
            record,
            &record.raster_1_source,
            &record.raster_2_source,
            seed_file_path,
        )
    }

    /// The command with the seed path left as a placeholder, for display.
    pub fn template(&self, record: &ParameterRecord) -> Result<String> {
        self.build_for_record(record, SEED_PLACEHOLDER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use std::path::PathBuf;

    fn posix() -> CommandBuilder {
        CommandBuilder::new(Platform::Posix, ToolConfig::new(PathBuf::from("/opt/conda")))
    }

    fn record() -> ParameterRecord {
        ParameterRecord {
            raster_1_source: "NETCDF:/data/vel.nc:vx".to_string(),
            raster_1_name: "vx".to_string(),
            raster_2_source: "NETCDF:/data/vel.nc:vy".to_string(),
            raster_2_name: "vy".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn minimal_posix_command() {
        let cmd = posix().build_for_record(&record(), "/tmp/seed.txt").unwrap();
        assert_eq!(
            cmd,
            r#""/opt/conda/bin/conda" run -n GMT6 "/opt/conda/envs/GMT6/bin/grd2stream" "/data/vel.nc?vx" "/data/vel.nc?vy" -f "/tmp/seed.txt""#
        );
    }

    #[test]
    fn flags_follow_fixed_order() {
        let mut rec = record();
        rec.output_format = Some(OutputFormat::Time);
        rec.max_steps = Some(500);
        rec.max_integration_time = Some(1000.5);
        rec.step_size = Some(0.25);
        rec.backward_steps = true;
        let cmd = posix().build_for_record(&rec, "/tmp/seed.txt").unwrap();
        assert!(cmd.ends_with(r#"-f "/tmp/seed.txt" -b -d 0.25 -T 1000.5 -n 500 -t"#));
    }

    #[test]
    fn build_is_deterministic() {
        let mut rec = record();
        rec.step_size = Some(100.0);
        rec.output_format = Some(OutputFormat::Velocity);
        let a = posix().build_for_record(&rec, "/tmp/s").unwrap();
        let b = posix().build_for_record(&rec, "/tmp/s").unwrap();
        assert_eq!(a, b);
        assert!(a.ends_with(" -d 100 -l"));
    }

    #[test]
    fn windows_invokes_tool_by_name() {
        let builder = CommandBuilder::new(Platform::Windows, ToolConfig::new(PathBuf::new()));
        let cmd = builder.template(&record()).unwrap();
        assert_eq!(
            cmd,
            r#"grd2stream "/data/vel.nc?vx" "/data/vel.nc?vy" -f "<seed_file_path>""#
        );
    }

    #[test]
    fn identical_selection_refused() {
        let mut rec = record();
        rec.raster_2_source = rec.raster_1_source.clone();
        let err = posix().build_for_record(&rec, "/tmp/s").unwrap_err();
        assert!(matches!(err, FlowlineError::Configuration(_)));

        // same source, different band is fine
        rec.band_2 = 2;
        assert!(posix().build_for_record(&rec, "/tmp/s").is_ok());
    }

    #[test]
    fn unset_raster_refused() {
        let mut rec = record();
        rec.raster_2_source.clear();
        assert!(posix().build_for_record(&rec, "/tmp/s").is_err());
    }

    #[test]
    fn paths_with_spaces_and_quotes_stay_one_argument() {
        assert_eq!(quote("/my data/v x.tif"), r#""/my data/v x.tif""#);
        assert_eq!(quote(r#"a"b$c"#), r#""a\"b\$c""#);
    }

    #[test]
    fn override_binary_runs_without_conda() {
        let mut tool = ToolConfig::new(PathBuf::from("/opt/conda"));
        tool.tool_override = Some(PathBuf::from("/usr/local/bin/grd2stream"));
        let builder = CommandBuilder::new(Platform::Posix, tool);
        let cmd = builder.build_for_record(&record(), "/tmp/s").unwrap();
        assert!(cmd.starts_with(r#""/usr/local/bin/grd2stream" "/data/vel.nc?vx""#));
    }
}
