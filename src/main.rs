//! `ringhash` command line tool.
//!
//! # Commands
//! ```text
//! ring       build the ring from the config file, print per-endpoint share
//! pick       print the anchor endpoint for a key or raw hash
//! simulate   run the full policy against a simulated transport
//! watch      like simulate, reloading the policy whenever the file changes
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;

use ringhash::config::loader::load_config;
use ringhash::config::watcher::ConfigWatcher;
use ringhash::load_balancer::events::forward_config_updates;
use ringhash::load_balancer::hash::affinity_hash;
use ringhash::load_balancer::policy::ring_endpoints;
use ringhash::load_balancer::{policy_channel, run_policy, Ring, RingHashPolicy};
use ringhash::lifecycle::shutdown::ctrl_c;
use ringhash::net::{SimulatedTransport, SimulationTiming};
use ringhash::observability::{logging, metrics};
use ringhash::resilience::backoff::BackoffConfig;
use ringhash::{PolicyConfig, Shutdown};

#[derive(Parser)]
#[command(name = "ringhash")]
#[command(about = "Ring hash load balancing policy tools", long_about = None)]
struct Cli {
    /// Policy configuration file (TOML).
    #[arg(short, long, default_value = "ringhash.toml")]
    config: PathBuf,

    /// Override the configured log level.
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show ring size and per-endpoint share
    Ring {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show which endpoint a key or hash lands on
    Pick {
        /// Routing key, hashed with xxHash64
        #[arg(long, conflicts_with = "hash", required_unless_present = "hash")]
        key: Option<String>,
        /// Raw 64-bit affinity hash
        #[arg(long)]
        hash: Option<u64>,
    },
    /// Run the policy against a simulated transport
    Simulate {
        #[command(flatten)]
        sim: SimulationArgs,
    },
    /// Run the policy and reload it when the config file changes (Ctrl+C to stop)
    Watch {
        #[command(flatten)]
        sim: SimulationArgs,
        /// Seconds between pick rounds
        #[arg(long, default_value_t = 5)]
        interval_secs: u64,
    },
}

#[derive(clap::Args)]
struct SimulationArgs {
    /// Number of routing keys to pick for
    #[arg(long, default_value_t = 16)]
    keys: usize,
    /// Addresses whose connection attempts fail
    #[arg(long)]
    down: Vec<String>,
    /// Simulated connect latency in milliseconds
    #[arg(long, default_value_t = 50)]
    connect_delay_ms: u64,
    /// How long a queued pick may wait, in milliseconds
    #[arg(long, default_value_t = 2000)]
    max_wait_ms: u64,
}

#[derive(Serialize)]
struct ShareRow<'a> {
    address: &'a str,
    weight: u32,
    positions: usize,
    percent: f64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.observability.log_level.clone());
    logging::init_logging(&level);

    tracing::info!(
        path = ?cli.config,
        endpoints = config.endpoints.len(),
        min_ring_size = config.ring_hash.min_ring_size,
        max_ring_size = config.ring_hash.max_ring_size,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    match cli.command {
        Commands::Ring { json } => print_ring(&config, json)?,
        Commands::Pick { key, hash } => {
            let hash = match (key, hash) {
                (Some(key), _) => affinity_hash(&key),
                (None, Some(hash)) => hash,
                (None, None) => return Err("either --key or --hash is required".into()),
            };
            print_pick(&config, hash)?;
        }
        Commands::Simulate { sim } => simulate(&config, &sim).await?,
        Commands::Watch { sim, interval_secs } => {
            watch(&cli.config, &config, &sim, Duration::from_secs(interval_secs)).await?
        }
    }

    Ok(())
}

fn build_ring(
    config: &PolicyConfig,
) -> Result<(Vec<ringhash::Endpoint>, Ring), ringhash::ConfigError> {
    let update = config.to_update();
    let endpoints = ring_endpoints(&update.endpoints);
    let ring = Ring::build(&endpoints, &update.config)?;
    Ok((endpoints, ring))
}

fn print_ring(config: &PolicyConfig, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (endpoints, ring) = build_ring(config)?;
    let shares = ring.shares();

    let rows: Vec<ShareRow<'_>> = endpoints
        .iter()
        .zip(&shares)
        .map(|(endpoint, &positions)| ShareRow {
            address: endpoint.address(),
            weight: endpoint.weight(),
            positions,
            percent: 100.0 * positions as f64 / ring.len() as f64,
        })
        .collect();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "ring_size": ring.len(),
                "endpoints": rows,
            }))?
        );
    } else {
        println!("ring size: {}", ring.len());
        for row in rows {
            println!(
                "{:<32} weight {:>4}  positions {:>8}  {:>6.2}%",
                row.address, row.weight, row.positions, row.percent
            );
        }
    }
    Ok(())
}

fn print_pick(config: &PolicyConfig, hash: u64) -> Result<(), Box<dyn std::error::Error>> {
    let (endpoints, ring) = build_ring(config)?;
    let index = ring.pick(hash);
    let entry = ring.entry(index);
    println!(
        "hash {:#018x} → entry {} ({:#018x}) → {}",
        hash,
        index,
        entry.hash,
        endpoints[entry.endpoint].address()
    );
    Ok(())
}

struct Simulation {
    policy_tx: ringhash::load_balancer::PolicySender,
    slot: Arc<ringhash::PickerSlot>,
    shutdown: Shutdown,
    event_loop: tokio::task::JoinHandle<()>,
}

fn start_simulation(sim: &SimulationArgs) -> Simulation {
    let (policy_tx, events) = policy_channel();
    let transport = Arc::new(SimulatedTransport::new(
        policy_tx.clone(),
        SimulationTiming {
            connect_delay: Duration::from_millis(sim.connect_delay_ms),
            ..SimulationTiming::default()
        },
    ));
    for address in &sim.down {
        transport.set_down(address, true);
    }

    let policy = RingHashPolicy::new(transport);
    let slot = policy.picker_slot();
    let shutdown = Shutdown::new();
    let event_loop = tokio::spawn(run_policy(policy, events, shutdown.subscribe()));

    Simulation {
        policy_tx,
        slot,
        shutdown,
        event_loop,
    }
}

async fn pick_round(slot: &ringhash::PickerSlot, sim: &SimulationArgs) {
    let backoff = BackoffConfig::default();
    let max_wait = Duration::from_millis(sim.max_wait_ms);

    for i in 0..sim.keys {
        let key = format!("key-{}", i);
        let hash = affinity_hash(&key);
        match slot.pick_or_wait(hash, max_wait, &backoff).await {
            Ok(backend) => println!("{:<10} {:#018x} → {}", key, hash, backend.address()),
            Err(e) => println!("{:<10} {:#018x} → {}", key, hash, e),
        }
    }
    if let Some(picker) = slot.current() {
        println!("aggregate state: {}", picker.state());
    }
}

async fn simulate(
    config: &PolicyConfig,
    sim: &SimulationArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let simulation = start_simulation(sim);
    simulation.policy_tx.update(config.to_update()).await?;

    pick_round(&simulation.slot, sim).await;

    simulation.shutdown.trigger();
    simulation.event_loop.await?;
    Ok(())
}

async fn watch(
    path: &Path,
    config: &PolicyConfig,
    sim: &SimulationArgs,
    interval: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let simulation = start_simulation(sim);
    simulation.policy_tx.update(config.to_update()).await?;

    let (watcher, configs) = ConfigWatcher::new(path);
    let _watcher = watcher.run()?;
    tokio::spawn(forward_config_updates(configs, simulation.policy_tx.clone()));

    let mut ticker = tokio::time::interval(interval);
    let stop = ctrl_c();
    tokio::pin!(stop);
    loop {
        tokio::select! {
            _ = ticker.tick() => pick_round(&simulation.slot, sim).await,
            _ = &mut stop => break,
        }
    }

    simulation.shutdown.trigger();
    simulation.event_loop.await?;
    Ok(())
}
