//! The flags and subcommands this tool exposes, and the glue that turns
//! a parsed invocation into a [`Selector`] + [`ChaosCommand`] +
//! [`crate::scheduler::TickSource`].

use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::command::{ChaosCommand, DEFAULT_INTERFACE};
use crate::selector::{Selector, SelectorError};

#[derive(Parser, Debug)]
#[command(name = "tempest", about = "Chaos injection engine for container workloads", version)]
pub struct Cli {
    /// Runtime socket, e.g. `unix:///var/run/docker.sock` or `tcp://host:2375`.
    #[arg(long, global = true, env = "DOCKER_HOST")]
    pub host: Option<String>,

    #[arg(long, global = true)]
    pub tls: bool,

    #[arg(long, global = true, env = "DOCKER_TLS_VERIFY")]
    pub tlsverify: bool,

    #[arg(long, global = true, env = "DOCKER_CERT_PATH")]
    pub tlscacert: Option<String>,

    #[arg(long, global = true)]
    pub tlscert: Option<String>,

    #[arg(long, global = true)]
    pub tlskey: Option<String>,

    /// Emit debug-level logs.
    #[arg(long, global = true)]
    pub debug: bool,

    /// Emit logs as JSON instead of the default human-readable format.
    #[arg(long, global = true)]
    pub json: bool,

    /// Accepted for CLI surface parity with the upstream tool; no Slack
    /// client is wired up, notification dispatch is outside the core
    /// this crate implements.
    #[arg(long, global = true)]
    pub slackhook: Option<String>,

    #[arg(long, global = true)]
    pub slackchannel: Option<String>,

    /// How often to run the chaos command. Required for every command.
    #[arg(long, global = true, value_parser = parse_duration)]
    pub interval: Duration,

    /// Narrow a non-empty match set down to a single random container.
    #[arg(long, global = true)]
    pub random: bool,

    /// Log what would happen; never call the runtime's mutating endpoints.
    #[arg(long, global = true)]
    pub dry: bool,

    /// Run the command exactly once, after one `--interval` wait, instead
    /// of recurring forever.
    #[arg(long, global = true)]
    pub once: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a signal to each target's main process.
    Kill {
        #[arg(long, default_value = "SIGKILL")]
        signal: String,
        targets: Vec<String>,
    },
    /// Inject network emulation faults via in-container `tc`.
    Netem {
        #[arg(long, value_parser = parse_duration)]
        duration: Duration,
        #[arg(long, default_value = DEFAULT_INTERFACE)]
        interface: String,
        /// Restrict the fault to traffic destined for this IP.
        #[arg(long)]
        target: Option<String>,
        /// Use the corrected `match ip dst <ip>` filter clause instead of
        /// the upstream-compatible (and semantically bogus) `dport` match.
        #[arg(long)]
        dst_match: bool,
        #[command(subcommand)]
        kind: NetemKind,
    },
    /// Pause every process in each target, then unpause after a duration.
    Pause {
        #[arg(long, value_parser = parse_duration)]
        duration: Duration,
        targets: Vec<String>,
    },
    /// Send the stop signal, then `SIGKILL` if still running after `--time`.
    Stop {
        #[arg(long, default_value_t = 10)]
        time: u64,
        targets: Vec<String>,
    },
    /// Remove each target outright.
    Rm {
        #[arg(long)]
        force: bool,
        #[arg(long)]
        links: bool,
        #[arg(long)]
        volumes: bool,
        targets: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum NetemKind {
    Delay {
        #[arg(long)]
        amount: u64,
        #[arg(long, default_value_t = 0)]
        variation: u64,
        #[arg(long, default_value_t = 0)]
        correlation: u8,
        targets: Vec<String>,
    },
    Loss {
        #[arg(long)]
        percent: u8,
        targets: Vec<String>,
    },
    Duplicate {
        #[arg(long)]
        percent: u8,
        targets: Vec<String>,
    },
    Corrupt {
        #[arg(long)]
        percent: u8,
        targets: Vec<String>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Selector(#[from] SelectorError),
    #[error(transparent)]
    Validation(#[from] crate::command::ValidationError),
    #[error("--interval ({interval:?}) must be strictly greater than the disruption's own duration ({duration:?})")]
    IntervalTooShort { interval: Duration, duration: Duration },
}

/// Parse a Go-`time.ParseDuration`-style string: a bare integer is
/// seconds; `ms`/`s`/`m`/`h` suffixes scale accordingly.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let s = raw.trim();
    if let Some(digits) = s.strip_suffix("ms") {
        return digits.parse().map(Duration::from_millis).map_err(|_| format!("invalid duration: {raw}"));
    }
    if let Some(digits) = s.strip_suffix('s') {
        return digits.parse().map(Duration::from_secs).map_err(|_| format!("invalid duration: {raw}"));
    }
    if let Some(digits) = s.strip_suffix('m') {
        return digits
            .parse::<u64>()
            .map(|m| Duration::from_secs(m * 60))
            .map_err(|_| format!("invalid duration: {raw}"));
    }
    if let Some(digits) = s.strip_suffix('h') {
        return digits
            .parse::<u64>()
            .map(|h| Duration::from_secs(h * 3600))
            .map_err(|_| format!("invalid duration: {raw}"));
    }
    s.parse().map(Duration::from_secs).map_err(|_| format!("invalid duration: {raw}"))
}

/// Extract `(selector, command, dst_match)` from a parsed invocation into
/// the engine's own [`Selector`]/[`ChaosCommand`] types, honoring the
/// target precedence rules, then checks that the scheduler interval
/// exceeds any transient-disruption duration. `dst_match` is only ever
/// `true` for a `netem` invocation that passed `--dst-match`; every
/// other command leaves it `false`.
pub fn resolve(cli: &Cli) -> Result<(Selector, ChaosCommand, bool), CliError> {
    let (targets, command, dst_match) = match &cli.command {
        Command::Kill { signal, targets } => (targets, ChaosCommand::Kill { signal: signal.clone() }, false),
        Command::Stop { time, targets } => (targets, ChaosCommand::Stop { wait_seconds: *time }, false),
        Command::Rm { force, links, volumes, targets } => (
            targets,
            ChaosCommand::Remove { force: *force, remove_links: *links, remove_volumes: *volumes },
            false,
        ),
        Command::Pause { duration, targets } => (targets, ChaosCommand::Pause { duration: *duration }, false),
        Command::Netem { duration, interface, target, dst_match, kind } => {
            let (targets, command) = netem_command(*duration, interface.clone(), target.clone(), kind);
            (targets, command, *dst_match)
        }
    };

    command.validate()?;

    if let Some(transient) = command.transient_duration() {
        if cli.interval <= transient {
            return Err(CliError::IntervalTooShort { interval: cli.interval, duration: transient });
        }
    }

    let selector = Selector::from_targets(targets)?;
    Ok((selector, command, dst_match))
}

fn netem_command<'a>(
    duration: Duration,
    interface: String,
    ip_filter: Option<String>,
    kind: &'a NetemKind,
) -> (&'a Vec<String>, ChaosCommand) {
    match kind {
        NetemKind::Delay { amount, variation, correlation, targets } => (
            targets,
            ChaosCommand::NetemDelay {
                duration,
                interface,
                ip_filter,
                amount_ms: *amount,
                variation_ms: *variation,
                correlation_percent: *correlation,
            },
        ),
        NetemKind::Loss { percent, targets } => {
            (targets, ChaosCommand::NetemLoss { duration, interface, ip_filter, percent: *percent })
        }
        NetemKind::Duplicate { percent, targets } => {
            (targets, ChaosCommand::NetemDuplicate { duration, interface, ip_filter, percent: *percent })
        }
        NetemKind::Corrupt { percent, targets } => {
            (targets, ChaosCommand::NetemCorrupt { duration, interface, ip_filter, percent: *percent })
        }
    }
}
