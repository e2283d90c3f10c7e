//! Fans `RuntimeClient::pause` out over every target, pausing and
//! later unpausing each one after its hold duration elapses.

use std::time::Duration;

use super::{ExecError, TargetFailure};
use crate::container::Container;
use crate::context::RunContext;
use crate::runtime::RuntimeClient;

pub async fn run(
    client: &dyn RuntimeClient,
    targets: &[Container],
    duration: Duration,
    ctx: &RunContext,
) -> Result<(), ExecError> {
    let mut failures = Vec::new();
    for container in targets {
        if let Err(error) = client.pause(container, duration, ctx.dry).await {
            failures.push(TargetFailure { container: container.display_name().to_string(), error });
        }
    }
    ExecError::from_failures(failures, targets.len())
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

    #[tokio::test]
    async fn pauses_every_target() {
        let client = FakeClient::with_containers(vec![container("a"), container("b")]);
        let ctx = RunContext::new(false, false);
        run(&client, &[container("a"), container("b")], Duration::from_secs(1), &ctx).await.unwrap();
        assert_eq!(
            client.calls(),
            vec![
                Call::Pause { id: "a".into(), dry: false },
                Call::Pause { id: "b".into(), dry: false },
            ]
        );
    }

    #[tokio::test]
    async fn a_leaked_unpause_is_surfaced_as_a_failure() {
        let client = FakeClient::with_containers(vec![container("a")]);
        client.fail_unpause();
        let ctx = RunContext::new(false, false);
        let err = run(&client, &[container("a")], Duration::from_millis(1), &ctx).await.unwrap_err();
        assert_eq!(err.failures.len(), 1);
    }
}
