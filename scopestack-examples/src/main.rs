//! Runs every scopestack demonstration scenario.
//!
//! Files are created in `$SCOPESTACK_WORKDIR` (default: the current
//! directory). Log verbosity follows `RUST_LOG` (default: `info`).

use anyhow::{Context, Result};
use scopestack_examples::{Demo, DemoConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let config = DemoConfig::from_env()?;
    std::fs::create_dir_all(config.workdir())
        .with_context(|| format!("creating {}", config.workdir().display()))?;
    info!(workdir = %config.workdir().display(), "Starting scopestack demo");

    let report = Demo::new(config).run_all();

    let failures = report.failures();
    info!(
        scenarios = report.outcomes().len(),
        failed = failures.len(),
        "Demo finished"
    );
    for outcome in failures {
        if let Err(failure) = &outcome.result {
            info!(scenario = outcome.name, "{failure}");
        }
    }

    Ok(())
}
