//! Command-line analyzer
//!
//! Writes one JSON object per line to stdout: a progress line per pipeline
//! stage, then either `{"status":"complete","path":...}` or `{"error":...}`.
//! Diagnostics go to stderr through `env_logger` (`RUST_LOG`, default `warn`).
//!
//! Exit status: 0 on success, 2 if the input could not be loaded, 1 otherwise.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;

use linear_analysis::{
    analyze_file, AnalysisConfig, AnalysisError, JsonFileWriter, ProgressEvent, ResultWriter,
};

#[derive(Parser, Debug)]
#[command(
    name = "linear-analyze",
    version,
    about = "Tempo, beats, key, chords, drums and timbre features of an audio file"
)]
struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG, AAC)
    input: PathBuf,

    /// Result file; defaults to a new file in the system temp directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Analysis settings as JSON; missing fields keep their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Indent the result JSON
    #[arg(long)]
    pretty: bool,

    /// Run every stage on a single thread
    #[arg(long)]
    sequential: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(path) => {
            emit(&json!({ "status": "complete", "path": path }));
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("{:#}", err);
            let input_error = err
                .downcast_ref::<AnalysisError>()
                .is_some_and(AnalysisError::is_input_error);
            emit(&json!({ "error": format!("{:#}", err) }));
            if input_error {
                ExitCode::from(2)
            } else {
                ExitCode::from(1)
            }
        }
    }
}

fn run(cli: &Cli) -> Result<PathBuf> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AnalysisConfig::default(),
    };
    if cli.sequential {
        config.parallel = false;
    }

    let progress = |event: &ProgressEvent| {
        emit(&json!({
            "status": "progress",
            "value": event.percent,
            "stage": event.stage.name(),
        }));
    };

    let result = analyze_file(&cli.input, &config, &progress)?;

    let writer = match &cli.output {
        Some(path) => JsonFileWriter::to_path(path),
        None => JsonFileWriter::temporary(),
    }
    .pretty(cli.pretty);

    Ok(writer.write(&result)?)
}

fn load_config(path: &Path) -> Result<AnalysisConfig> {
    let file = File::open(path).with_context(|| format!("opening config {}", path.display()))?;
    let config = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing config {}", path.display()))?;
    Ok(config)
}

fn emit(line: &serde_json::Value) {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    // A closed stdout leaves nobody to report to
    let _ = writeln!(out, "{}", line);
    let _ = out.flush();
}
