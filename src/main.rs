//! Tempest, a chaos injection engine for container workloads.
//!
//! Parses a single invocation (global flags + one chaos subcommand),
//! validates it, connects to the container runtime, installs the
//! signal-driven shutdown handler, then drives the scheduler until
//! either the one-shot tick completes or a termination signal arrives.

use clap::Parser;
use tracing::{error, info};

use tempest::cli::Cli;
use tempest::context::RunContext;
use tempest::runtime::docker::{DockerClient, TlsPaths};
use tempest::scheduler::{self, TickSource};
use tempest::{cli, lifecycle};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug, cli.json);

    let (selector, command, dst_match) = match cli::resolve(&cli) {
        Ok(resolved) => resolved,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let tls = match build_tls(&cli) {
        Ok(tls) => tls,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let client = match DockerClient::connect(cli.host.as_deref(), tls) {
        Ok(client) => client,
        Err(e) => {
            error!("failed to connect to the container runtime: {}", e);
            std::process::exit(1);
        }
    };

    let ctx = RunContext::new(cli.dry, cli.random).with_dst_match(dst_match);
    lifecycle::install(&ctx);

    let tick_source =
        if cli.once { TickSource::Once(cli.interval) } else { TickSource::Recurring(cli.interval) };

    info!(once = cli.once, dry = cli.dry, random = cli.random, "starting tempest");
    scheduler::run(&client, selector, command, ctx.clone(), tick_source).await;

    if ctx.is_shutting_down() {
        info!("drained in-flight disruptions after shutdown signal, exiting");
        std::process::exit(1);
    }
}

/// Bundles `--tlscacert`/`--tlscert`/`--tlskey` into a [`TlsPaths`] when
/// `--tls` or `--tlsverify` was requested. Certificate loading itself is
/// left to `bollard`; this only gathers the paths the CLI surface
/// exposes and hands them over.
fn build_tls(cli: &Cli) -> Result<Option<TlsPaths>, String> {
    if !cli.tls && !cli.tlsverify {
        return Ok(None);
    }

    match (&cli.tlscacert, &cli.tlscert, &cli.tlskey) {
        (Some(ca_cert), Some(cert), Some(key)) => Ok(Some(TlsPaths {
            ca_cert: ca_cert.clone(),
            cert: cert.clone(),
            key: key.clone(),
        })),
        _ => Err("--tls/--tlsverify requires --tlscacert, --tlscert, and --tlskey".to_string()),
    }
}

fn init_tracing(debug: bool, json: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("tempest={}", default_level).into());

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
