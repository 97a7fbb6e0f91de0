use anyhow::Result;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli;
mod command;
mod config;
mod error;
mod executor;
mod flowline;
mod io;
mod parser;
mod preset;
mod raster;
mod state;

use cli::{Args, Commands, PresetCommand, RunArgs, SelectionArgs, get_args};
use command::CommandBuilder;
use config::{NumericInputs, Platform, ToolConfig, provisioning_hint};
use error::FlowlineError;
use executor::ProcessExecutor;
use flowline::{RunOutcome, compute_flowline};
use io::GeometrySink;
use io::csv::{CsvSink, create_csv_sink};
use io::geojson::create_geojson_sink;
use io::results::Streamline;
use preset::PresetStore;
use raster::RasterLayer;
use state::{RunOptions, SessionState};

fn main() -> Result<ExitCode> {
    let args = get_args();
    init_logging(args.verbose);
    let platform = args.platform.unwrap_or_else(Platform::current);

    match run(&args, platform) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => match err.downcast_ref::<FlowlineError>() {
            Some(flowline_err) => {
                report(flowline_err, platform);
                Ok(ExitCode::FAILURE)
            }
            None => Err(err),
        },
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn report(err: &FlowlineError, platform: Platform) {
    match err {
        FlowlineError::ToolUnavailable(msg) => {
            eprintln!("{}", msg);
            if let Some(hint) = provisioning_hint(platform) {
                eprintln!("{}", hint);
            }
        }
        FlowlineError::ExecutionFailure { code, stderr } => {
            eprintln!("grd2stream failed (exit code {:?}):", code);
            eprintln!("{}", stderr.trim_end());
        }
        FlowlineError::EmptyResult => {
            eprintln!("grd2stream ran successfully but the integration produced no points.");
        }
        other => eprintln!("Error: {}", other),
    }
}

fn run(args: &Args, platform: Platform) -> Result<()> {
    let mut tool = ToolConfig::new(
        args.conda_root
            .clone()
            .unwrap_or_else(ToolConfig::default_conda_root),
    );
    tool.tool_override = args.tool.clone();
    let builder = CommandBuilder::new(platform, tool);
    let mut store = PresetStore::open(&args.presets);

    match &args.command {
        Commands::Run(run_args) => run_flowline(run_args, builder, &mut store),
        Commands::Command(selection) => {
            let session = load_session(selection, &store)?;
            println!("{}", builder.template(&session.snapshot()?)?);
            Ok(())
        }
        Commands::Preset(cmd) => manage_presets(cmd, &mut store),
        Commands::Check => {
            builder.tool.check_available(platform)?;
            println!("Conda launcher: {}", builder.tool.launcher().display());
            println!("grd2stream:     {}", builder.tool.tool_path().display());
            println!("grd2stream is ready.");
            Ok(())
        }
    }
}

fn load_session(selection: &SelectionArgs, store: &PresetStore) -> Result<SessionState> {
    let mut session = SessionState::new();
    if let Some(name) = &selection.preset {
        session.apply_preset(store, name)?;
        println!("Preset '{}' loaded.", name);
        return Ok(session);
    }

    let source_1 = selection.raster1.as_deref().unwrap_or_default();
    let source_2 = selection.raster2.as_deref().unwrap_or_default();
    let layer_1 = RasterLayer::open(source_1, selection.name1.as_deref().unwrap_or_default())?;
    let layer_2 = RasterLayer::open(source_2, selection.name2.as_deref().unwrap_or_default())?;

    let options = RunOptions {
        backward_steps: selection.backward,
        output_format: selection.format,
        numeric: NumericInputs {
            step_size: selection.step_size.clone(),
            max_integration_time: selection.max_time.clone(),
            max_steps: selection.max_steps.clone(),
        },
    };
    session.select((layer_1, selection.band1), (layer_2, selection.band2), &options)?;
    Ok(session)
}

fn run_flowline(args: &RunArgs, builder: CommandBuilder, store: &mut PresetStore) -> Result<()> {
    let mut session = load_session(&args.selection, store)?;
    if let (Some(layer_1), Some(layer_2)) = (&session.raster_1, &session.raster_2) {
        println!(
            "Selected rasters: {}, {} (Bands: {}, {})",
            layer_1.name, layer_2.name, session.record.band_1, session.record.band_2
        );
    }
    session.set_coordinate(args.x, args.y);

    let executor = ProcessExecutor::new(builder);
    match compute_flowline(&session, &executor, &args.crs)? {
        RunOutcome::Computed(streamline) => write_output(&streamline, args.output.as_deref())?,
        RunOutcome::CommandOnly { command, seed } => {
            println!("On Windows, grd2stream command execution is not available.");
            println!("The command that would be executed is:\n\n{}\n", command);
            println!("With seed point at: x={}, y={}", seed.0, seed.1);
        }
    }

    if let Some(name) = &args.save_as {
        session.save_as_preset(store, name, args.overwrite)?;
        println!("Preset '{}' saved.", name.trim());
    }
    Ok(())
}

fn write_output(streamline: &Streamline, output: Option<&Path>) -> Result<()> {
    let Some(path) = output else {
        let mut sink = CsvSink::from_writer(std::io::stdout().lock());
        sink.write_streamline(streamline)?;
        sink.into_inner()?;
        return Ok(());
    };

    let is_geojson = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("geojson") || ext.eq_ignore_ascii_case("json"));
    if is_geojson {
        let mut sink = create_geojson_sink(path)?;
        sink.write_streamline(streamline)?;
        sink.into_inner().flush()?;
    } else {
        create_csv_sink(path)?.write_streamline(streamline)?;
    }
    println!(
        "Layer '{}' with {} points saved to {}",
        streamline.name,
        streamline.points.len(),
        path.display()
    );
    Ok(())
}

fn manage_presets(cmd: &PresetCommand, store: &mut PresetStore) -> Result<()> {
    let not_found = |name: &str| FlowlineError::config(format!("Preset '{}' not found.", name));
    match cmd {
        PresetCommand::List => {
            let names = store.names();
            if names.is_empty() {
                println!("No presets stored in {}", store.path().display());
            }
            for name in names {
                let edited = store
                    .get(&name)
                    .and_then(|r| r.last_edited)
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("{:<30} {}", name, edited);
            }
        }
        PresetCommand::Show { name } => {
            let record = store.get(name).ok_or_else(|| not_found(name.as_str()))?;
            println!("{}", serde_json::to_string_pretty(record)?);
        }
        PresetCommand::Delete { name } => {
            if !store.contains(name) {
                return Err(not_found(name.as_str()).into());
            }
            if !store.delete(name) {
                return Err(FlowlineError::StoreIo(format!("Failed to delete preset '{}'.", name)).into());
            }
            println!("Preset '{}' deleted.", name);
        }
        PresetCommand::Rename { old, new } => {
            store.rename(old, new)?;
            println!("Preset '{}' renamed to '{}'.", old, new.trim());
        }
        PresetCommand::Export { name, file } => {
            if !store.contains(name) {
                return Err(not_found(name.as_str()).into());
            }
            if !store.export(name, file) {
                return Err(FlowlineError::StoreIo(format!("Failed to export preset '{}'.", name)).into());
            }
            println!("Preset '{}' exported to {}", name, file.display());
        }
        PresetCommand::Import { file } => {
            if !store.import(file) {
                return Err(FlowlineError::StoreIo(format!(
                    "Failed to import preset(s) from {}.",
                    file.display()
                ))
                .into());
            }
            println!("Preset(s) imported. {} preset(s) available.", store.names().len());
        }
    }
    Ok(())
}
