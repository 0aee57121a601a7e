//! scull Server Binary
//!
//! Creates the device registry and serves it over TCP.

use std::sync::Arc;

use clap::{Parser, ValueEnum};
use scull::config::TrimPolicy;
use scull::network::Server;
use scull::{Config, Registry};
use tracing_subscriber::{fmt, EnvFilter};

/// scull Server
#[derive(Parser, Debug)]
#[command(name = "scull-server")]
#[command(about = "In-memory sparse storage devices over TCP")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:7070")]
    listen: String,

    /// Number of devices
    #[arg(short = 'n', long, default_value = "4")]
    nr_devs: u32,

    /// Minor number of the first device
    #[arg(long, default_value = "0")]
    minor_base: u32,

    /// Bytes per quantum
    #[arg(short, long, default_value = "4000")]
    quantum: usize,

    /// Quanta per qset node
    #[arg(short = 's', long, default_value = "1000")]
    qset: usize,

    /// Geometry applied by trim
    #[arg(long, value_enum, default_value = "reload-defaults")]
    trim_policy: TrimPolicyArg,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "64")]
    max_connections: usize,

    /// Worker threads
    #[arg(short, long, default_value = "8")]
    workers: usize,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TrimPolicyArg {
    /// Trim adopts the current default geometry
    ReloadDefaults,
    /// Trim keeps the device's geometry
    KeepGeometry,
}

impl From<TrimPolicyArg> for TrimPolicy {
    fn from(arg: TrimPolicyArg) -> Self {
        match arg {
            TrimPolicyArg::ReloadDefaults => TrimPolicy::ReloadDefaults,
            TrimPolicyArg::KeepGeometry => TrimPolicy::KeepGeometry,
        }
    }
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,scull=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("scull server v{}", scull::VERSION);
    tracing::info!(
        "{} devices from minor {}, quantum {}, qset {}",
        args.nr_devs,
        args.minor_base,
        args.quantum,
        args.qset
    );

    let config = Config::builder()
        .listen_addr(&args.listen)
        .nr_devs(args.nr_devs)
        .minor_base(args.minor_base)
        .quantum(args.quantum)
        .qset(args.qset)
        .trim_policy(args.trim_policy.into())
        .max_connections(args.max_connections)
        .worker_threads(args.workers)
        .build();

    let registry = match Registry::new(&config) {
        Ok(r) => Arc::new(r),
        Err(e) => {
            tracing::error!("Failed to create devices: {}", e);
            std::process::exit(1);
        }
    };

    let server = match Server::bind(config, Arc::clone(&registry)) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received shutdown signal, stopping server...");
        shutdown.shutdown();
    }) {
        tracing::error!("Failed to install signal handler: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    drop(server);
    match Arc::try_unwrap(registry) {
        Ok(registry) => registry.close(),
        Err(_) => tracing::warn!("Registry still shared at exit, skipping teardown"),
    }

    tracing::info!("Server stopped");
}
