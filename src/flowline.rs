use crate::error::{FlowlineError, Result};
use crate::executor::{Execution, ProcessExecutor};
use crate::io::results::Streamline;
use crate::parser::parse;
use crate::state::SessionState;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// Points ready for the geometry sink.
    Computed(Streamline),
    /// Execution is not possible here; the command is shown instead.
    CommandOnly { command: String, seed: (f64, f64) },
}

/// Runs grd2stream for the session's parameters and seed point.
///
/// A tool failure and an empty result are reported as different errors, so
/// the caller can tell "crashed" from "produced nothing".
pub fn compute_flowline(
    session: &SessionState,
    executor: &ProcessExecutor,
    crs: &str,
) -> Result<RunOutcome> {
    let record = session.snapshot().map_err(|_| {
        FlowlineError::config("Two raster layers must be selected.")
    })?;
    let seed = session
        .coordinate
        .ok_or_else(|| FlowlineError::config("A coordinate must be selected."))?;

    let output = match executor.execute(&record, seed)? {
        Execution::NotExecutable { command, seed } => {
            return Ok(RunOutcome::CommandOnly { command, seed });
        }
        Execution::Completed(output) => output,
    };
    let stdout = output.into_stdout()?;
    debug!("Raw output:\n{}", stdout);

    let points: Vec<_> = parse(&stdout, record.output_format).collect();
    if points.is_empty() {
        return Err(FlowlineError::EmptyResult);
    }
    info!("Parsed {} streamline points", points.len());
    Ok(RunOutcome::Computed(Streamline::new(
        crs,
        record.output_format,
        points,
    )))
}
