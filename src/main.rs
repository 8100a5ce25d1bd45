mod batch;
mod error;
mod extract;
mod fetcher;
mod input;
mod output;
mod record;
mod resolver;
mod settings;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::{debug, error, warn};

use fetcher::Fetcher;
use resolver::Resolver;
use settings::Settings;

#[derive(Parser)]
#[command(
    name = "personvardi",
    about = "Collect name counts and explanations from personvardi.pmlp.gov.lv"
)]
struct Cli {
    /// Path to the input JSON file
    input: PathBuf,

    /// Where to write results (default: output/personvardi.json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Concurrent lookups (default: available CPU parallelism)
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Registry endpoint
    #[arg(long)]
    base_url: Option<String>,

    /// Per-request timeout in seconds (default: 10)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Retries on connection failures (default: 3)
    #[arg(long)]
    retries: Option<u32>,

    /// Initial retry backoff in milliseconds, doubled per attempt (default: 500)
    #[arg(long)]
    backoff_ms: Option<u64>,
}

impl Cli {
    fn apply(&self, settings: &mut Settings) {
        if let Some(output) = &self.output {
            settings.output = output.clone();
        }
        if let Some(n) = self.concurrency {
            settings.concurrency = Some(n);
        }
        if let Some(url) = &self.base_url {
            settings.base_url = url.clone();
        }
        if let Some(secs) = self.timeout_secs {
            settings.timeout_secs = secs;
        }
        if let Some(retries) = self.retries {
            settings.retries = retries;
        }
        if let Some(ms) = self.backoff_ms {
            settings.backoff_ms = ms;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let mut settings = Settings::load()?;
    cli.apply(&mut settings);
    debug!(?settings, "settings loaded");

    // Input problems are fatal before any request goes out
    let requests = timed("load_requests", || input::load_requests(&cli.input))?;

    let pool_size = settings.pool_size();
    let resolver = Arc::new(Resolver::new(Fetcher::new(&settings)?));
    println!("Resolving {} names on {} workers...", requests.len(), pool_size);

    let t_batch = Instant::now();
    let outcome = tokio::select! {
        outcome = batch::run_batch(resolver, requests, pool_size) => outcome,
        _ = tokio::signal::ctrl_c() => {
            bail!("Interrupted; no output written");
        }
    };
    debug!("run_batch took {:.2} seconds", t_batch.elapsed().as_secs_f64());

    println!(
        "Done: {} lookups ({} unique names, {} not found, {} errors).",
        outcome.total,
        outcome.collection.len(),
        outcome.not_found,
        outcome.failures
    );

    if outcome.collection.is_empty() {
        warn!("No names resolved; writing an empty collection");
    }

    let bytes = output::render(&outcome.collection)?;
    if let Err(e) = timed("save", || output::save(&settings.output, &bytes)) {
        // Keep the batch result reachable even when the file can't be written
        std::io::stdout().write_all(&bytes)?;
        println!();
        return Err(e);
    }
    println!(
        "Saved {} names to {}",
        outcome.collection.len(),
        settings.output.display()
    );

    println!("Total time elapsed: {}", format_duration(t0.elapsed()));
    Ok(())
}

fn timed<T>(label: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let start = Instant::now();
    debug!("Starting {}", label);
    let result = f();
    match &result {
        Ok(_) => debug!("{} took {:.2} seconds", label, start.elapsed().as_secs_f64()),
        Err(e) => error!("Error in {}: {:#}", label, e),
    }
    result
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.2}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
