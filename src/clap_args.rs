use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to the trace file (CSV or TSV)
    pub trace_file: PathBuf,

    /// Hardware configuration label attached to the report
    #[arg(long, default_value = "default")]
    pub hardware: String,

    /// Path to a carbontrace.toml config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbose mode (-v, --verbose)
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn parse() -> Args {
    Args::parse()
}
