use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};
use rand::Rng;
use tracing::{debug, error, info, warn};

use soma_core::{Outcome, Signal, SomaConfig};
use soma_limbic::{LimbicScheduler, NeutralProvider, TickOutcome};

#[derive(Parser, Debug)]
#[command(author, version, about = "Drive-based limbic scheduler for dormant agents", long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "soma.toml", env = "SOMA_CONFIG")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the periodic tick loop
    Run,
    /// Print per-kind pressure, cooldowns and the quiet window
    Status,
    /// Suppress emissions for a number of hours
    Quiet { hours: f64 },
    /// Clear the quiet window
    Wake,
    /// Manually boost a signal kind's pressure
    Boost { kind: String, amount: f64 },
    /// Record the outcome of acting on an emitted signal
    Outcome { kind: String, outcome: String },
    /// Show past emissions, most recent first
    History {
        kind: Option<String>,
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = SomaConfig::load_or_default(&args.config);

    let scheduler = LimbicScheduler::open(&config, Arc::new(NeutralProvider), Utc::now())?;

    match args.command {
        Command::Run => run_loop(&config, &scheduler).await,
        Command::Status => {
            let status = scheduler.status(Utc::now()).await;
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(())
        }
        Command::Quiet { hours } => {
            if !hours.is_finite() || hours <= 0.0 {
                anyhow::bail!("quiet hours must be a positive number, got {hours}");
            }
            let window = scheduler
                .set_quiet(Duration::from_secs_f64(hours * 3600.0), Utc::now())
                .await?;
            println!("{}", serde_json::to_string_pretty(&window)?);
            Ok(())
        }
        Command::Wake => {
            let window = scheduler.clear_quiet().await?;
            println!("{}", serde_json::to_string_pretty(&window)?);
            Ok(())
        }
        Command::Boost { kind, amount } => {
            let kind: Signal = kind.parse()?;
            scheduler.boost_signal(kind, amount, Utc::now()).await?;
            println!("boosted {kind} by {amount}");
            Ok(())
        }
        Command::Outcome { kind, outcome } => {
            let kind: Signal = kind.parse()?;
            let outcome: Outcome = outcome.parse()?;
            scheduler.record_outcome(kind, outcome).await?;
            println!("recorded {outcome} for {kind}");
            Ok(())
        }
        Command::History { kind, limit } => {
            let kind = kind.map(|k| k.parse::<Signal>()).transpose()?;
            for emitted in scheduler.history(kind, limit).await {
                println!("{}", serde_json::to_string(&emitted)?);
            }
            Ok(())
        }
    }
}

async fn run_loop(config: &SomaConfig, scheduler: &LimbicScheduler) -> anyhow::Result<()> {
    info!(
        interval_secs = config.tick_interval_secs,
        state_path = %config.state_path,
        "limbic loop starting"
    );

    loop {
        match scheduler.tick(Utc::now()).await {
            Ok(report) => {
                if report.provider_degraded {
                    warn!("tick ran with neutral boosts: provider degraded");
                }
                match report.outcome {
                    TickOutcome::Emitted(emitted) => {
                        // The decision pipeline consumes the directive; the
                        // driver just hands it over.
                        println!("{}", emitted.directive);
                    }
                    TickOutcome::Idle => debug!("tick idle"),
                }
            }
            Err(e) => error!(error = %e, "tick failed, retrying next interval"),
        }

        let jitter = if config.tick_jitter_secs > 0 {
            rand::thread_rng().gen_range(0..=config.tick_jitter_secs)
        } else {
            0
        };
        tokio::time::sleep(Duration::from_secs(config.tick_interval_secs + jitter)).await;
    }
}
