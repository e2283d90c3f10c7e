//! One tick's worth of work: resolve the target set, apply the command,
//! log the outcome. Errors from individual targets are aggregated
//! instead of failing the whole tick on the first one.

use tracing::{info, warn};

use crate::command::ChaosCommand;
use crate::context::RunContext;
use crate::executor::{self, ExecError};
use crate::runtime::{RuntimeClient, RuntimeError};
use crate::selector::Selector;

/// Result of a single dispatcher tick, for the scheduler's logging and
/// for tests that want to assert on how many targets were touched.
#[derive(Debug)]
pub struct TickOutcome {
    pub matched: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("resolving targets: {0}")]
    Resolve(#[from] RuntimeError),
    #[error("applying command: {0}")]
    Apply(#[from] ExecError),
}

/// Resolve targets against `selector`, apply `command` to every match,
/// and return how many containers were touched. An empty match set is
/// not an error: the tick simply did nothing.
pub async fn dispatch(
    client: &dyn RuntimeClient,
    selector: &Selector,
    command: &ChaosCommand,
    ctx: &RunContext,
) -> Result<TickOutcome, DispatchError> {
    let targets = crate::selector::resolve(client, selector, ctx.random).await?;

    if targets.is_empty() {
        info!("no running containers matched this tick's selector");
        return Ok(TickOutcome { matched: 0 });
    }

    let names: Vec<&str> = targets.iter().map(|c| c.display_name()).collect();
    info!(targets = ?names, "applying chaos command");

    match executor::apply(client, &targets, command, ctx).await {
        Ok(()) => Ok(TickOutcome { matched: targets.len() }),
        Err(err) => {
            warn!("{}", err);
            Err(DispatchError::Apply(err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Container;
    use crate::runtime::test_support::FakeClient;

    fn running(name: &str) -> Container {
        Container {
            id: format!("id-{name}"),
            name: name.to_string(),
            image: "alpine".into(),
            labels: Default::default(),
            running: true,
        }
    }

    #[tokio::test]
    async fn empty_match_set_is_a_no_op_not_an_error() {
        let client = FakeClient::with_containers(vec![running("a")]);
        let ctx = RunContext::new(false, false);
        let sel = Selector::NameList(vec!["missing".to_string()]);
        let outcome = dispatch(&client, &sel, &ChaosCommand::Kill { signal: "SIGKILL".into() }, &ctx)
            .await
            .unwrap();
        assert_eq!(outcome.matched, 0);
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn dispatch_applies_command_to_every_matched_target() {
        let client = FakeClient::with_containers(vec![running("a"), running("b")]);
        let ctx = RunContext::new(false, false);
        let outcome = dispatch(&client, &Selector::All, &ChaosCommand::Kill { signal: "SIGKILL".into() }, &ctx)
            .await
            .unwrap();
        assert_eq!(outcome.matched, 2);
        assert_eq!(client.calls().len(), 2);
    }

    #[tokio::test]
    async fn a_failing_target_surfaces_as_a_dispatch_error() {
        let client = FakeClient::with_containers(vec![running("a")]);
        client.fail_id("id-a", "boom");
        let ctx = RunContext::new(false, false);
        let result =
            dispatch(&client, &Selector::All, &ChaosCommand::Kill { signal: "SIGKILL".into() }, &ctx).await;
        assert!(matches!(result, Err(DispatchError::Apply(_))));
    }
}
