//! Punchcard bot runner.
//!
//! Reads one JSON event per line from stdin, dispatches it against the
//! ledger and writes the rendered reply to stdout. Logs go to stderr.
//!
//! Usage: punchcard [config.json]

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use punch_runtime::{Dispatcher, Event, FileLedgerStore, Punchcard, RuntimeConfig, SharedPunchcard};
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_tracing();

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config =
        RuntimeConfig::load(config_path.as_deref()).context("failed to load configuration")?;

    let store = FileLedgerStore::new(&config.data_file);
    let punchcard = Punchcard::from_config(store, &config).context("invalid configuration")?;
    info!(
        domains = config.tracked_domains.len(),
        punches_per_reward = config.punches_per_reward,
        data_file = %config.data_file.display(),
        "punchcard ready"
    );
    let dispatcher = Dispatcher::new(SharedPunchcard::new(punchcard));

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for (index, line) in stdin.lock().lines().enumerate() {
        let line = line.context("failed to read event stream")?;
        if line.trim().is_empty() {
            continue;
        }
        let line_no = index + 1;

        let event: Event = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                warn!(line = line_no, error = %e, "skipping malformed event");
                continue;
            }
        };

        match dispatcher.handle(&event) {
            Ok(Some(reply)) => writeln!(stdout, "{reply}")?,
            Ok(None) => {}
            Err(e) => {
                error!(line = line_no, error = %e, "event failed");
                writeln!(stdout, "❌ Punchcard update failed: {e}")?;
            }
        }
        stdout.flush()?;
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}
