//! asyncq CLI: run the producer/consumer simulation or a kitchen demo.

use std::path::PathBuf;
use std::time::Duration;

use asyncq::config::{Config, SimConfig};
use asyncq::error::Error;
use asyncq::kitchen::{CancelOutcome, Kitchen};
use asyncq::model::SimulationReport;
use asyncq::sim::Simulator;
use asyncq::telemetry::{TelemetryConfig, init_telemetry};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "asyncq", about = "Producer/consumer queue simulation and concurrency demos")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the producer/consumer simulation
    Simulate {
        /// TOML file with simulation settings
        #[arg(long)]
        config: Option<PathBuf>,
        /// Number of producers
        #[arg(long)]
        producers: Option<usize>,
        /// Number of consumers (one sentinel is sent to each)
        #[arg(long)]
        consumers: Option<usize>,
        /// Items each producer puts on the queue
        #[arg(long)]
        items: Option<u32>,
        /// Queue capacity (0 = unbounded)
        #[arg(long)]
        capacity: Option<usize>,
        /// Print the final report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run a cooperative concurrency demo
    Kitchen {
        #[arg(value_enum, default_value_t = Demo::All)]
        demo: Demo,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Demo {
    Sequential,
    Concurrent,
    Timeout,
    Cancel,
    Group,
    AsCompleted,
    Blocking,
    Threads,
    Pool,
    All,
}

// One runtime thread: every producer and consumer is multiplexed on it and
// only yields at await points. Blocking work still goes to the blocking pool.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "asyncq".to_string(),
        log_level: config.log_level.clone(),
    })?;

    match cli.command {
        Command::Simulate {
            config: file,
            producers,
            consumers,
            items,
            capacity,
            json,
        } => {
            let mut sim = match file {
                Some(path) => SimConfig::load(&path)?,
                None => config.sim,
            };
            if let Some(n) = producers {
                sim.producers = n;
            }
            if let Some(n) = consumers {
                sim.consumers = n;
            }
            if let Some(n) = items {
                sim.items_per_producer = n;
            }
            if let Some(n) = capacity {
                sim.queue_capacity = n;
            }
            cmd_simulate(sim, json).await
        }
        Command::Kitchen { demo } => cmd_kitchen(demo).await,
    }
}

async fn cmd_simulate(sim: SimConfig, json: bool) -> anyhow::Result<()> {
    let report = Simulator::new(sim).run().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &SimulationReport) {
    println!("Run:          {}", report.run_id);
    println!("Phase:        {}", report.phase);
    println!("Produced:     {}", report.items_produced());
    println!("Consumed:     {}", report.items_consumed());
    println!("Sentinels:    {}", report.sentinels_sent);
    println!("Acknowledged: {}", report.acknowledged);
    println!("Tasks:        {}", report.tasks_completed());
    println!("Elapsed:      {}ms", report.elapsed_ms);
    println!("---");
    for consumer in &report.consumers {
        let labels: Vec<String> = consumer.consumed.iter().map(|i| i.label()).collect();
        println!("{:<12}  {}", consumer.name, labels.join(", "));
    }
}

async fn cmd_kitchen(demo: Demo) -> anyhow::Result<()> {
    let kitchen = Kitchen::default();
    let demos = match demo {
        Demo::All => Demo::value_variants()
            .iter()
            .copied()
            .filter(|d| *d != Demo::All)
            .collect(),
        one => vec![one],
    };

    for demo in demos {
        info!(?demo, "running demo");
        run_demo(&kitchen, demo).await?;
    }
    Ok(())
}

async fn run_demo(kitchen: &Kitchen, demo: Demo) -> anyhow::Result<()> {
    match demo {
        Demo::Sequential => {
            kitchen.prepare_sequential().await;
        }
        Demo::Concurrent => {
            kitchen.prepare_concurrent().await;
        }
        Demo::Timeout => match kitchen.cook_with_timeout(Duration::from_secs(1)).await {
            Ok(dish) => info!("{dish}"),
            Err(Error::Timeout(_)) => warn!("Burger took too long! Cancelled."),
            Err(e) => return Err(e.into()),
        },
        Demo::Cancel => {
            if let CancelOutcome::Finished(dish) =
                kitchen.cancel_after(Duration::from_secs(1)).await?
            {
                info!("burger finished before cancellation: {dish}");
            }
        }
        Demo::Group => {
            kitchen.task_group().await?;
        }
        Demo::AsCompleted => {
            kitchen.stream_as_completed().await?;
        }
        Demo::Blocking => {
            kitchen.offload_blocking().await?;
        }
        Demo::Threads => {
            kitchen.run_in_threads(4).await?;
        }
        Demo::Pool => {
            let kitchen = *kitchen;
            tokio::task::spawn_blocking(move || kitchen.run_in_pool(2, &[0, 1, 2, 3])).await??;
        }
        // Expanded into the individual demos by cmd_kitchen.
        Demo::All => {}
    }
    Ok(())
}
