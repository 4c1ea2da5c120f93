use std::path::PathBuf;

use anyhow::Context;
use hivsim::{CohortOptions, SimContext, run_cohort};
use log::{info, warn};

fn main() -> anyhow::Result<()> {
    // Setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let config_path = args.next().map(PathBuf::from);
    let num_patients = args
        .next()
        .map(|n| n.parse::<u64>())
        .transpose()
        .context("number of patients must be a non-negative integer")?
        .unwrap_or(10_000);
    let seed = args
        .next()
        .map(|s| s.parse::<u64>())
        .transpose()
        .context("seed must be a non-negative integer")?
        .unwrap_or(42);

    let config = match &config_path {
        Some(path) => SimContext::from_json_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => {
            warn!("No configuration file given, using the built-in defaults");
            let config = SimContext::default();
            config.validate().context("built-in configuration is invalid")?;
            config
        }
    };
    info!("{config}");

    let options = CohortOptions {
        num_patients,
        seed,
        show_progress: true,
        ..CohortOptions::default()
    };
    let results = run_cohort(&config, &options)?;
    info!("{results}");
    Ok(())
}
