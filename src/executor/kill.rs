//! Fans `RuntimeClient::kill` out over every target.

use super::{ExecError, TargetFailure};
use crate::container::Container;
use crate::context::RunContext;
use crate::runtime::RuntimeClient;

pub async fn run(
    client: &dyn RuntimeClient,
    targets: &[Container],
    signal: &str,
    ctx: &RunContext,
) -> Result<(), ExecError> {
    let mut failures = Vec::new();
    for container in targets {
        if let Err(error) = client.kill(container, signal, ctx.dry).await {
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
    async fn sends_signal_to_every_target() {
        let client = FakeClient::with_containers(vec![container("a"), container("b")]);
        let ctx = RunContext::new(false, false);
        run(&client, &[container("a"), container("b")], "SIGUSR1", &ctx).await.unwrap();
        assert_eq!(
            client.calls(),
            vec![
                Call::Kill { id: "a".into(), signal: "SIGUSR1".into(), dry: false },
                Call::Kill { id: "b".into(), signal: "SIGUSR1".into(), dry: false },
            ]
        );
    }

    #[tokio::test]
    async fn dry_run_is_forwarded_to_the_client() {
        let client = FakeClient::with_containers(vec![container("a")]);
        let ctx = RunContext::new(true, false);
        run(&client, &[container("a")], "SIGKILL", &ctx).await.unwrap();
        assert_eq!(client.calls(), vec![Call::Kill { id: "a".into(), signal: "SIGKILL".into(), dry: true }]);
    }
}
