use carbontrace::{clap_args, config::Config, errors::AnalysisError, report, run};
use tracing::{subscriber::set_global_default, Subscriber};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let args = clap_args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    let subscriber = get_subscriber(default_filter.to_string());
    init_subscriber(subscriber);

    let document = match load_config(&args) {
        Ok(config) => run(&args.trace_file, &args.hardware, &config),
        Err(e) => report::failure(&AnalysisError::Unexpected(e)),
    };

    // stdout carries exactly one JSON document; everything else is on stderr
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

fn load_config(args: &clap_args::Args) -> anyhow::Result<Config> {
    match &args.config {
        Some(path) => Config::try_from_path(path),
        None => Ok(Config::default()),
    }
}

fn get_subscriber(env_filter: String) -> impl Subscriber + Sync + Send {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish()
}

fn init_subscriber(subscriber: impl Subscriber + Sync + Send) {
    set_global_default(subscriber).expect("Failed to set subscriber");
}
