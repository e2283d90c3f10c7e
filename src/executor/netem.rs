//! Netem executors: `delay`/`loss`/`duplicate`/`corrupt`, all built on the
//! same transient-disruption shape. Apply a `tc` qdisc, hold for
//! `duration`, then revert it, via the same create/start/drain exec
//! pattern used for any other in-container command.
//!
//! State, per target, walks IDLE -> ACTIVE (setup succeeded) ->
//! REVERTING -> IDLE, or ERROR if setup itself failed, or LEAKED if
//! teardown fails after a successful setup: a container left with a
//! live qdisc the engine no longer knows about.

use std::time::Duration;

use super::{ExecError, TargetFailure};
use crate::command::ChaosCommand;
use crate::container::Container;
use crate::context::RunContext;
use crate::runtime::{RuntimeClient, RuntimeError};

fn netem_tail(command: &ChaosCommand) -> Vec<String> {
    match command {
        ChaosCommand::NetemDelay { amount_ms, variation_ms, correlation_percent, .. } => vec![
            "delay".to_string(),
            format!("{amount_ms}ms"),
            format!("{variation_ms}ms"),
            format!("{correlation_percent}%"),
        ],
        ChaosCommand::NetemLoss { percent, .. } => vec!["loss".to_string(), format!("{percent}%")],
        ChaosCommand::NetemDuplicate { percent, .. } => vec!["duplicate".to_string(), format!("{percent}%")],
        ChaosCommand::NetemCorrupt { percent, .. } => vec!["corrupt".to_string(), format!("{percent}%")],
        other => unreachable!("netem_tail called with non-netem command {other:?}"),
    }
}

fn common(command: &ChaosCommand) -> (Duration, &str, Option<&str>) {
    match command {
        ChaosCommand::NetemDelay { duration, interface, ip_filter, .. }
        | ChaosCommand::NetemLoss { duration, interface, ip_filter, .. }
        | ChaosCommand::NetemDuplicate { duration, interface, ip_filter, .. }
        | ChaosCommand::NetemCorrupt { duration, interface, ip_filter, .. } => {
            (*duration, interface.as_str(), ip_filter.as_deref())
        }
        other => unreachable!("common called with non-netem command {other:?}"),
    }
}

/// Builds the setup and teardown `tc` invocations for one netem command.
///
/// Unfiltered targets get a single `qdisc add ... root netem ...` setup.
/// IP-filtered targets get a three-command sequence: a `prio` qdisc at
/// the root, the netem qdisc hung off band `1:3`, and a `u32` filter
/// routing matching traffic into that band. Both cases tear down with
/// the same single `qdisc del ... root netem`; filtered and unfiltered
/// share one teardown shape.
///
/// `dst_match` selects the filter's match clause: the default keeps the
/// compatibility `match ip dport <ip>` filter (semantically matches a
/// port against an IP address, effectively matching nothing), `dst_match`
/// swaps in the corrected `match ip dst <ip>`.
fn build_argv(
    command: &ChaosCommand,
    interface: &str,
    ip_filter: Option<&str>,
    dst_match: bool,
) -> (Vec<Vec<String>>, Vec<Vec<String>>) {
    let tail = netem_tail(command);
    let teardown = vec![
        "tc".to_string(),
        "qdisc".into(),
        "del".into(),
        "dev".into(),
        interface.into(),
        "root".into(),
        "netem".into(),
    ];

    match ip_filter {
        None => {
            let mut setup = vec![
                "tc".to_string(),
                "qdisc".into(),
                "add".into(),
                "dev".into(),
                interface.into(),
                "root".into(),
                "netem".into(),
            ];
            setup.extend(tail);

            (vec![setup], vec![teardown])
        }
        Some(ip) => {
            let prio = vec![
                "tc".to_string(),
                "qdisc".into(),
                "add".into(),
                "dev".into(),
                interface.into(),
                "root".into(),
                "handle".into(),
                "1:".into(),
                "prio".into(),
            ];

            let mut child = vec![
                "tc".to_string(),
                "qdisc".into(),
                "add".into(),
                "dev".into(),
                interface.into(),
                "parent".into(),
                "1:3".into(),
                "netem".into(),
            ];
            child.extend(tail);

            let match_clause = if dst_match {
                vec!["match".to_string(), "ip".into(), "dst".into(), ip.to_string()]
            } else {
                vec!["match".to_string(), "ip".into(), "dport".into(), ip.to_string()]
            };

            let mut filter = vec![
                "tc".to_string(),
                "filter".into(),
                "add".into(),
                "dev".into(),
                interface.into(),
                "protocol".into(),
                "ip".into(),
                "parent".into(),
                "1:0".into(),
                "prio".into(),
                "3".into(),
                "u32".into(),
            ];
            filter.extend(match_clause);
            filter.push("flowid".into());
            filter.push("1:3".into());

            (vec![prio, child, filter], vec![teardown])
        }
    }
}

pub async fn run(
    client: &dyn RuntimeClient,
    targets: &[Container],
    command: &ChaosCommand,
    ctx: &RunContext,
) -> Result<(), ExecError> {
    let (duration, interface, ip_filter) = common(command);
    let (setup, teardown) = build_argv(command, interface, ip_filter, ctx.dst_match);

    let mut failures = Vec::new();
    for container in targets {
        if let Err(error) = apply_one(client, container, &setup, &teardown, duration, ctx).await {
            failures.push(TargetFailure { container: container.display_name().to_string(), error });
        }
    }
    ExecError::from_failures(failures, targets.len())
}

async fn apply_one(
    client: &dyn RuntimeClient,
    container: &Container,
    setup: &[Vec<String>],
    teardown: &[Vec<String>],
    duration: Duration,
    ctx: &RunContext,
) -> Result<(), RuntimeError> {
    for argv in setup {
        let argv_refs: Vec<&str> = argv.iter().map(String::as_str).collect();
        client.exec(container, &argv_refs, true, ctx.dry).await?;
    }

    tokio::select! {
        _ = tokio::time::sleep(duration) => {}
        _ = ctx.shutdown.cancelled() => {}
    }

    // Run every teardown command even if one of them fails, and surface
    // the last error: a partially-reverted qdisc chain still counts as
    // leaked, but we don't want one failed `tc` call skipping cleanup of
    // the rest of the chain.
    let mut last_err = None;
    for argv in teardown {
        let argv_refs: Vec<&str> = argv.iter().map(String::as_str).collect();
        if let Err(e) = client.exec(container, &argv_refs, true, ctx.dry).await {
            last_err = Some(e);
        }
    }

    match last_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::test_support::{Call, FakeClient};

    fn container(id: &str) -> Container {
        Container {
            id: id.to_string(),
            name: id.to_string(),
            image: "alpine".into(),
            labels: Default::default(),
            running: true,
        }
    }

    fn delay_cmd(ip_filter: Option<&str>) -> ChaosCommand {
        ChaosCommand::NetemDelay {
            duration: Duration::from_millis(1),
            interface: "eth0".to_string(),
            ip_filter: ip_filter.map(str::to_string),
            amount_ms: 100,
            variation_ms: 10,
            correlation_percent: 20,
        }
    }

    #[test]
    fn unfiltered_build_produces_the_literal_commands() {
        let (setup, teardown) = build_argv(&delay_cmd(None), "eth0", None, false);
        assert_eq!(setup.len(), 1);
        assert_eq!(teardown.len(), 1);
        assert_eq!(
            setup[0],
            vec!["tc", "qdisc", "add", "dev", "eth0", "root", "netem", "delay", "100ms", "10ms", "20%"]
        );
        assert_eq!(teardown[0], vec!["tc", "qdisc", "del", "dev", "eth0", "root", "netem"]);
    }

    #[test]
    fn filtered_build_defaults_to_the_dport_match() {
        let (setup, teardown) = build_argv(&delay_cmd(Some("10.0.0.5")), "eth0", Some("10.0.0.5"), false);
        assert_eq!(setup.len(), 3);
        assert!(setup[2].iter().any(|t| t == "dport"));
        assert!(!setup[2].iter().any(|t| t == "dst"));
        assert!(setup[2].iter().any(|t| t == "10.0.0.5"));
        assert_eq!(setup[2].last().unwrap(), "1:3");
        // filtered and unfiltered share the same teardown shape
        assert_eq!(teardown[0], vec!["tc", "qdisc", "del", "dev", "eth0", "root", "netem"]);
    }

    #[test]
    fn filtered_build_uses_dst_match_when_requested() {
        let (setup, _) = build_argv(&delay_cmd(Some("10.0.0.5")), "eth0", Some("10.0.0.5"), true);
        assert!(setup[2].iter().any(|t| t == "dst"));
        assert!(!setup[2].iter().any(|t| t == "dport"));
    }

    #[tokio::test]
    async fn run_executes_setup_then_teardown_in_order() {
        let client = FakeClient::with_containers(vec![container("a")]);
        let ctx = RunContext::new(false, false);
        run(&client, &[container("a")], &delay_cmd(None), &ctx).await.unwrap();

        let calls = client.calls();
        assert_eq!(calls.len(), 2);
        match (&calls[0], &calls[1]) {
            (Call::Exec { argv: setup, .. }, Call::Exec { argv: teardown, .. }) => {
                assert_eq!(setup[2], "add");
                assert_eq!(teardown[2], "del");
            }
            _ => panic!("expected two exec calls"),
        }
    }

    #[tokio::test]
    async fn setup_failure_skips_teardown_entirely() {
        let client = FakeClient::with_containers(vec![container("a")]);
        client.fail_id("a", "tc: command not found");
        let ctx = RunContext::new(false, false);
        let err = run(&client, &[container("a")], &delay_cmd(None), &ctx).await.unwrap_err();
        assert_eq!(err.failures.len(), 1);
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn dry_run_never_calls_exec() {
        let client = FakeClient::with_containers(vec![container("a")]);
        let ctx = RunContext::new(true, false);
        run(&client, &[container("a")], &delay_cmd(None), &ctx).await.unwrap();
        // dry calls are still recorded by the fake, but marked dry; the
        // real client is the one that skips the runtime call.
        assert!(client.calls().iter().all(|c| matches!(c, Call::Exec { dry: true, .. })));
    }
}
