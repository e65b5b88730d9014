pub mod carbon_intensity;
pub mod clap_args;
pub mod config;
pub mod dataset;
pub mod errors;
pub mod models;
pub mod normalize;
pub mod report;
pub mod trace;

use chrono::Local;
use config::Config;
use dataset::TraceDataset;
use errors::AnalysisError;
use serde_json::Value;
use std::path::Path;
use tracing::{error, info};

/// Runs the full analysis for one trace file and always returns a document
/// to print: the report on success, the uniform failure document otherwise.
/// Failure is part of the output contract, never an exit code.
pub fn run(trace_path: &Path, hardware: &str, config: &Config) -> Value {
    match analyse(trace_path, hardware, config) {
        Ok(report) => report,
        Err(e) => {
            error!("{}", e);
            report::failure(&e)
        }
    }
}

fn analyse(trace_path: &Path, hardware: &str, config: &Config) -> Result<Value, AnalysisError> {
    info!("analysing trace {}", trace_path.display());

    let table = trace::TraceTable::from_path(trace_path)?;
    let (rows, caps) = normalize::normalize(&table, &config.trace);
    let intensity = carbon_intensity::resolve(&config.intensity, Local::now());
    let derived = models::estimate(rows, &caps, &config.model, intensity);
    let dataset = TraceDataset::new(derived, caps, intensity);

    Ok(report::assemble(&dataset, hardware, config.output.dialect))
}
