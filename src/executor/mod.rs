//! Action executors: apply one validated [`ChaosCommand`] to a resolved
//! target set.
//!
//! Each executor fans one operation out over every matched container and
//! aggregates the failures instead of stopping at the first one, since a
//! single bad target must not stop a tick from reaching the rest of its
//! targets.

mod kill;
mod netem;
mod pause;
mod remove;
mod stop;

use std::fmt;

use crate::command::ChaosCommand;
use crate::container::Container;
use crate::context::RunContext;
use crate::runtime::{RuntimeClient, RuntimeError};

/// A single target's failure, kept alongside its container name so a
/// caller logging an `ExecError` doesn't need to re-correlate ids.
#[derive(Debug)]
pub struct TargetFailure {
    pub container: String,
    pub error: RuntimeError,
}

/// One or more targets failed during a tick. Carries every failure, not
/// just the first, and the total target count for context.
#[derive(Debug)]
pub struct ExecError {
    pub failures: Vec<TargetFailure>,
    pub total: usize,
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} target(s) failed", self.failures.len(), self.total)?;
        for failure in &self.failures {
            write!(f, "; {}: {}", failure.container, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExecError {}

impl ExecError {
    fn from_failures(failures: Vec<TargetFailure>, total: usize) -> Result<(), ExecError> {
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ExecError { failures, total })
        }
    }
}

/// Apply `command` to every container in `targets`. An empty `targets`
/// slice is a no-op, the dispatcher already treats an empty match set
/// as "nothing to do" before reaching here.
pub async fn apply(
    client: &dyn RuntimeClient,
    targets: &[Container],
    command: &ChaosCommand,
    ctx: &RunContext,
) -> Result<(), ExecError> {
    match command {
        ChaosCommand::Kill { signal } => kill::run(client, targets, signal, ctx).await,
        ChaosCommand::Stop { wait_seconds } => stop::run(client, targets, *wait_seconds, ctx).await,
        ChaosCommand::Pause { duration } => pause::run(client, targets, *duration, ctx).await,
        ChaosCommand::Remove { force, remove_links, remove_volumes } => {
            remove::run(client, targets, *force, *remove_links, *remove_volumes, ctx).await
        }
        _ if command.is_netem() => netem::run(client, targets, command, ctx).await,
        _ => unreachable!("ChaosCommand variants are exhaustively matched above"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::test_support::FakeClient;

    fn container(id: &str) -> Container {
        Container {
            id: id.to_string(),
            name: id.to_string(),
            image: "alpine".into(),
            labels: Default::default(),
            running: true,
        }
    }

    #[tokio::test]
    async fn empty_targets_is_a_no_op() {
        let client = FakeClient::empty();
        let ctx = RunContext::new(false, false);
        let result = apply(&client, &[], &ChaosCommand::Kill { signal: "SIGKILL".into() }, &ctx).await;
        assert!(result.is_ok());
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn kill_dispatches_to_kill_executor() {
        let client = FakeClient::with_containers(vec![container("a")]);
        let ctx = RunContext::new(false, false);
        apply(&client, &[container("a")], &ChaosCommand::Kill { signal: "SIGTERM".into() }, &ctx)
            .await
            .unwrap();
        assert_eq!(client.calls().len(), 1);
    }

    #[tokio::test]
    async fn one_failing_target_does_not_block_the_rest() {
        let client = FakeClient::with_containers(vec![container("a"), container("b")]);
        client.fail_id("a", "boom");
        let ctx = RunContext::new(false, false);
        let result = apply(
            &client,
            &[container("a"), container("b")],
            &ChaosCommand::Kill { signal: "SIGKILL".into() },
            &ctx,
        )
        .await;
        let err = result.unwrap_err();
        assert_eq!(err.failures.len(), 1);
        assert_eq!(err.total, 2);
        // the second target still got its call recorded despite the first failing
        assert_eq!(client.calls().len(), 1);
    }
}
