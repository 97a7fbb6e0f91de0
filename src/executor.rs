use crate::command::CommandBuilder;
use crate::config::{ParameterRecord, Platform};
use crate::error::{FlowlineError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::process::Command;
use std::time::Duration;
use tracing::{info, warn};

/// Seed file name shown in commands that are displayed but not run.
const DISPLAY_SEED_FILE: &str = "seed.txt";

/// Captured result of one grd2stream run.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Stdout of a successful run, or the captured stderr as failure.
    pub fn into_stdout(self) -> Result<String> {
        if self.success() {
            Ok(self.stdout)
        } else {
            Err(FlowlineError::ExecutionFailure {
                code: self.exit_code,
                stderr: self.stderr,
            })
        }
    }
}

#[derive(Debug, Clone)]
pub enum Execution {
    Completed(ToolOutput),
    /// The platform cannot run grd2stream; this is what would have run.
    NotExecutable { command: String, seed: (f64, f64) },
}

pub struct ProcessExecutor {
    builder: CommandBuilder,
    show_progress: bool,
}

impl ProcessExecutor {
    pub fn new(builder: CommandBuilder) -> Self {
        ProcessExecutor {
            builder,
            show_progress: true,
        }
    }

    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Runs grd2stream for one seed point.
    ///
    /// The seed goes into a temporary file that is removed when this returns,
    /// whatever the outcome. A non-zero exit status is not an error here; see
    /// [`ToolOutput::into_stdout`].
    pub fn execute(&self, record: &ParameterRecord, seed: (f64, f64)) -> Result<Execution> {
        if self.builder.platform == Platform::Windows {
            let command = self.builder.build_for_record(record, DISPLAY_SEED_FILE)?;
            info!("Windows command (not executed): {}", command);
            return Ok(Execution::NotExecutable { command, seed });
        }

        // refuse bad parameters before touching the filesystem
        self.builder.template(record)?;
        self.builder.tool.check_available(self.builder.platform)?;

        let mut seed_file = tempfile::Builder::new()
            .prefix("grd2stream_seed_")
            .suffix(".txt")
            .tempfile()
            .map_err(|e| staging_error("create seed file", e))?;
        writeln!(seed_file, "{} {}", seed.0, seed.1)
            .and_then(|_| seed_file.flush())
            .map_err(|e| staging_error("write seed file", e))?;

        let seed_path = seed_file.path().to_string_lossy().into_owned();
        let command = self.builder.build_for_record(record, &seed_path)?;
        info!("Executing command: {}", command);

        let spinner = self.spinner();
        let output = Command::new("sh").arg("-c").arg(&command).output();
        spinner.finish_and_clear();
        // seed_file is dropped (and deleted) on every path below
        let output = output.map_err(|e| staging_error("start shell", e))?;

        let result = ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        };
        if !result.success() {
            warn!(
                "Command failed with status {:?}: {}",
                result.exit_code,
                result.stderr.trim()
            );
        }
        Ok(Execution::Completed(result))
    }

    fn spinner(&self) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
            pb.set_style(style);
        }
        pb.set_message("Running grd2stream...");
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }
}

fn staging_error(action: &str, e: std::io::Error) -> FlowlineError {
    FlowlineError::ExecutionFailure {
        code: None,
        stderr: format!("could not {}: {}", action, e),
    }
}
