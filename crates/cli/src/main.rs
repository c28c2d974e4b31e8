//! `jobtrack` -- submit jobs to the processing backend and follow them.
//!
//! # Environment variables
//!
//! | Variable                        | Default                 | Description                        |
//! |---------------------------------|-------------------------|------------------------------------|
//! | `JOBTRACK_API_BASE_URL`         | `http://localhost:8123` | Backend base URL                   |
//! | `JOBTRACK_POLL_INTERVAL_MS`     | `3000`                  | Delay between status fetches       |
//! | `JOBTRACK_REQUEST_TIMEOUT_SECS` | `30`                    | Per-request HTTP timeout           |
//! | `JOBTRACK_TRANSPORT_BACKOFF`    | `false`                 | Back off while the API is down     |
//! | `JOBTRACK_BACKOFF_MAX_MS`       | `30000`                 | Ceiling for the backoff delay      |
//!
//! Command-line flags take precedence over the environment.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jobtrack_cli::interactive;
use jobtrack_cli::output::{render_health, render_submitted, OutputFormat};
use jobtrack_client::api::{HealthComponent, HttpBackend};
use jobtrack_client::config::ClientConfig;
use jobtrack_client::submitter::Submitter;
use jobtrack_client::tracker::Tracker;
use jobtrack_core::handle::JobHandle;
use jobtrack_core::request::JobDraft;

#[derive(Parser, Debug)]
#[command(name = "jobtrack")]
#[command(version)]
#[command(about = "Submit processing jobs and track them to completion")]
#[command(propagate_version = true)]
struct Args {
    /// Backend base URL (overrides JOBTRACK_API_BASE_URL)
    #[arg(long, short = 'a', global = true)]
    base_url: Option<String>,

    /// Poll interval in milliseconds (overrides JOBTRACK_POLL_INTERVAL_MS)
    #[arg(long, global = true)]
    interval_ms: Option<u64>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Queue a new job
    Submit {
        /// Owner of the job
        #[arg(long)]
        user_id: Option<String>,

        /// Comma-separated integer items, e.g. "42, 78, 134"
        #[arg(long)]
        items: Option<String>,

        /// Free-form note
        #[arg(long)]
        note: Option<String>,

        /// Start from the sample payload; explicit flags still apply
        #[arg(long)]
        sample: bool,

        /// Keep polling the new job until it settles
        #[arg(short, long)]
        follow: bool,
    },
    /// Track an existing job; reads r / q / <task id> commands from stdin
    Track {
        /// The task id returned on submission
        task_id: String,
    },
    /// Probe the backend health endpoints
    Health {
        /// Single component to probe
        #[arg(value_parser = ["api", "db", "redis", "celery"])]
        component: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jobtrack_cli=info,jobtrack_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut config = ClientConfig::from_env()?;
    if let Some(url) = &args.base_url {
        config = config.with_base_url(url);
    }
    if let Some(ms) = args.interval_ms {
        anyhow::ensure!(ms > 0, "--interval-ms must be greater than zero");
        config = config.with_poll_interval(Duration::from_millis(ms));
    }

    tracing::debug!(
        base_url = %config.base_url,
        poll_interval_ms = config.poll_interval.as_millis() as u64,
        "Configuration loaded",
    );

    let backend = Arc::new(HttpBackend::new(&config)?);

    match args.command {
        Commands::Submit {
            user_id,
            items,
            note,
            sample,
            follow,
        } => {
            let mut draft = if sample {
                JobDraft::sample()
            } else {
                JobDraft::default()
            };
            if let Some(user_id) = user_id {
                draft.owner_id = user_id;
            }
            if let Some(items) = items {
                draft.items = items;
            }
            if let Some(note) = note {
                draft.note = note;
            }

            let handle = Submitter::new(backend.clone()).submit_draft(&draft).await?;
            println!("{}", render_submitted(&handle, args.output)?);

            if follow {
                let mut tracker = Tracker::new(backend, &config);
                tracker.start_session(handle);
                interactive::run(
                    &mut tracker,
                    tokio::io::empty(),
                    &mut std::io::stdout(),
                    args.output,
                )
                .await?;
            }
        }
        Commands::Track { task_id } => {
            let handle = JobHandle::parse(&task_id)?;
            let mut tracker = Tracker::new(backend, &config);
            tracker.start_session(handle);
            interactive::run(
                &mut tracker,
                BufReader::new(tokio::io::stdin()),
                &mut std::io::stdout(),
                args.output,
            )
            .await?;
        }
        Commands::Health { component } => {
            let components: Vec<HealthComponent> = match component {
                Some(name) => HealthComponent::from_name(&name).into_iter().collect(),
                None => HealthComponent::ALL.to_vec(),
            };

            let reports = backend.health_all(&components).await;
            println!("{}", render_health(&reports, args.output)?);

            let unhealthy = reports.iter().filter(|r| !r.healthy).count();
            if unhealthy > 0 {
                anyhow::bail!("{unhealthy} component(s) unhealthy");
            }
        }
    }

    Ok(())
}
