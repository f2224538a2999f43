use std::path::PathBuf;

use anyhow::Result;
use vinspect::{write_report, BackendCache, Config, Pipeline};

#[derive(argh::FromArgs)]
/// Visual anomaly inspection over an MVTec-AD style dataset.
struct Args {
    /// path to the JSON config
    #[argh(option)]
    config: PathBuf,

    /// category to inspect, overriding data.category
    #[argh(option)]
    category: Option<String>,

    /// results file, overriding paths.outputs/paths.results_json
    #[argh(option)]
    output: Option<PathBuf>,

    /// show a progress bar
    #[argh(switch)]
    progress: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();

    let args: Args = argh::from_env();

    let mut config = Config::from_json_file(&args.config)?;
    if let Some(category) = args.category {
        config.data.category = category;
    }
    let output = args
        .output
        .unwrap_or_else(|| config.paths.results_path());

    let mut cache = BackendCache::new();
    let mut pipeline = Pipeline::from_config(config, &mut cache)?.with_progress(args.progress);
    let report = pipeline.run()?;
    write_report(&output, &report)?;

    Ok(())
}
